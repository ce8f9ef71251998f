use std::fmt;
use std::time::Duration;

use reqwest::{header, StatusCode};
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    options::{BasicAuth, ConnectionConfig, RetryPolicy},
    retry::RetryState,
    wire::{store_error_message, OperationRequest},
    DocStoreError, Result, StoreResponse,
};

/// Sends one [`OperationRequest`] with bounded retry and normalizes the outcome.
#[derive(Clone)]
pub(crate) struct RequestExecutor {
    http: reqwest::Client,
    base_url: String,
    auth: Option<BasicAuth>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Raw result of one attempt that reached the store.
struct Reply {
    status: StatusCode,
    text: String,
}

impl RequestExecutor {
    pub(crate) fn new(config: &ConnectionConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url(),
            auth: config.auth.clone(),
            retry: config.retry.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    pub(crate) async fn execute(&self, request: &OperationRequest) -> Result<StoreResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let payload = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| DocStoreError::Decode {
                message: format!("could not encode request body: {err}"),
                attempts: 0,
            })?;

        let mut state = RetryState::new(&self.retry);
        loop {
            let attempts = state.begin_attempt();

            let reply = match self.send_once(request, &url, payload.as_deref()).await {
                Ok(reply) => reply,
                Err(err) => {
                    if let Some(delay) = state.next_backoff() {
                        self.wait_before_retry(request, attempts, delay).await;
                        continue;
                    }
                    return Err(DocStoreError::Transport {
                        source: err,
                        attempts,
                    });
                }
            };

            let status = reply.status;
            if reply.text.trim().is_empty() {
                if status.is_client_error() || status.is_server_error() {
                    return Err(DocStoreError::Http {
                        status: status.as_u16(),
                        message: generic_status_message(status),
                        attempts,
                    });
                }
                return Ok(StoreResponse {
                    body: Value::Null,
                    attempts,
                });
            }

            let body: Value =
                serde_json::from_str(&reply.text).map_err(|err| DocStoreError::Decode {
                    message: format!("invalid response JSON: {err}; body: {}", reply.text),
                    attempts,
                })?;

            let store_error = store_error_message(&body);
            if store_error.is_some() {
                if let Some(delay) = state.next_backoff() {
                    self.wait_before_retry(request, attempts, delay).await;
                    continue;
                }
            }

            if status.is_client_error() || status.is_server_error() {
                return Err(DocStoreError::Http {
                    status: status.as_u16(),
                    message: store_error.unwrap_or_else(|| generic_status_message(status)),
                    attempts,
                });
            }

            if let Some(message) = store_error {
                return Err(DocStoreError::Store { message, attempts });
            }

            return Ok(StoreResponse { body, attempts });
        }
    }

    async fn send_once(
        &self,
        request: &OperationRequest,
        url: &str,
        payload: Option<&[u8]>,
    ) -> std::result::Result<Reply, reqwest::Error> {
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .timeout(self.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(auth) = &self.auth {
            builder = builder.basic_auth(&auth.username, auth.password.as_deref());
        }
        // content-length follows from the byte body; no body, no header.
        if let Some(bytes) = payload {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(bytes.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok(Reply { status, text })
    }

    async fn wait_before_retry(&self, request: &OperationRequest, attempt: u32, delay: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            attempt,
            "retrying store request after {} ms",
            delay.as_millis()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (request, attempt);

        sleep(delay).await;
    }
}

fn generic_status_message(status: StatusCode) -> String {
    format!("document store responded with status {}", status.as_u16())
}
