//! Read-through cache shortcut backed by memcached.
//!
//! The cache is only ever read. Entries are written and expired by whatever
//! process populates memcached; writes made through this crate do not touch it.

use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};
use url::form_urlencoded;

use crate::{
    decode::is_absent_marker,
    executor::RequestExecutor,
    options::ConnectionConfig,
    wire::OperationRequest,
    DocStoreError, Result, StoreResponse,
};

/// Longest key memcached accepts.
const MAX_KEY_LEN: usize = 250;

/// Largest value block read back, memcached's default item size limit.
const MAX_ITEM_BYTES: usize = 1024 * 1024;

/// How read requests reach the store, chosen once per client.
#[derive(Clone, Debug)]
pub(crate) enum Fetch {
    Direct,
    CacheThenDirect(MemcachedCache),
}

impl Fetch {
    pub(crate) fn from_config(config: &ConnectionConfig) -> Self {
        match &config.cache {
            None => Self::Direct,
            Some(endpoint) => Self::CacheThenDirect(MemcachedCache {
                host: endpoint
                    .host
                    .clone()
                    .unwrap_or_else(|| config.host.clone()),
                port: endpoint.port,
                lookup_timeout: Duration::from_millis(endpoint.lookup_timeout_ms),
                auth_user: config.auth.as_ref().map(|auth| auth.username.clone()),
            }),
        }
    }

    /// Serves GET requests from the cache when possible, otherwise runs them
    /// through the executor.
    pub(crate) async fn fetch(
        &self,
        executor: &RequestExecutor,
        request: &OperationRequest,
    ) -> Result<StoreResponse> {
        if let Self::CacheThenDirect(cache) = self {
            if request.method == Method::GET {
                if let Some(response) = cache.lookup(request).await? {
                    return Ok(response);
                }
            }
        }
        executor.execute(request).await
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum CacheError {
    #[error("cache i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache lookup timed out after {0} ms")]
    Timeout(u128),
    #[error("unexpected cache reply: {0}")]
    Protocol(String),
}

#[derive(Clone, Debug)]
pub(crate) struct MemcachedCache {
    host: String,
    port: u16,
    lookup_timeout: Duration,
    auth_user: Option<String>,
}

impl MemcachedCache {
    /// `Ok(Some)` on a hit, `Err(NotFound)` on an absent marker, `Ok(None)`
    /// when the request should fall through to the store.
    pub(crate) async fn lookup(&self, request: &OperationRequest) -> Result<Option<StoreResponse>> {
        let key = cache_key(request, self.auth_user.as_deref());
        if !is_valid_key(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, "request cannot be expressed as a cache key");
            return Ok(None);
        }

        let raw = match self.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(key = %key, "cache miss");
                return Ok(None);
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key = %key, error = %_err, "cache lookup failed, using store");
                return Ok(None);
            }
        };

        let payload: Value = match serde_json::from_slice(&raw) {
            Ok(payload) => payload,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key = %key, error = %_err, "cached payload is not JSON, using store");
                return Ok(None);
            }
        };

        if is_absent_marker(&payload) {
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %key, "cache holds absent marker");
            return Err(DocStoreError::NotFound);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(key = %key, "cache hit");
        Ok(Some(StoreResponse {
            body: payload,
            attempts: 0,
        }))
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
        timeout(self.lookup_timeout, self.get_unbounded(key))
            .await
            .map_err(|_| CacheError::Timeout(self.lookup_timeout.as_millis()))?
    }

    async fn get_unbounded(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let mut stream = BufReader::new(stream);
        stream
            .get_mut()
            .write_all(format!("get {key}\r\n").as_bytes())
            .await?;

        let header = read_reply_line(&mut stream).await?;
        if header == "END" {
            return Ok(None);
        }

        let length = value_length(&header)?;
        let block = length
            .checked_add(2)
            .ok_or_else(|| CacheError::Protocol(header.clone()))?;

        let mut data = vec![0u8; block];
        stream.read_exact(&mut data).await?;
        if !data.ends_with(b"\r\n") {
            return Err(CacheError::Protocol("value block not terminated".to_owned()));
        }
        data.truncate(length);

        let trailer = read_reply_line(&mut stream).await?;
        if trailer != "END" {
            return Err(CacheError::Protocol(trailer));
        }
        Ok(Some(data))
    }
}

/// Byte count announced by a `VALUE <key> <flags> <bytes> [<cas>]` header.
fn value_length(header: &str) -> std::result::Result<usize, CacheError> {
    let length = header
        .strip_prefix("VALUE ")
        .and_then(|rest| rest.split_whitespace().nth(2))
        .and_then(|bytes| bytes.parse::<usize>().ok())
        .ok_or_else(|| CacheError::Protocol(header.to_owned()))?;
    if length > MAX_ITEM_BYTES {
        return Err(CacheError::Protocol(format!(
            "value of {length} bytes exceeds {MAX_ITEM_BYTES}"
        )));
    }
    Ok(length)
}

async fn read_reply_line(
    stream: &mut BufReader<TcpStream>,
) -> std::result::Result<String, CacheError> {
    let mut line = String::new();
    if stream.read_line(&mut line).await? == 0 {
        return Err(CacheError::Protocol("connection closed".to_owned()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// `[user@]/path[?query&source=<json body>]`
pub(crate) fn cache_key(request: &OperationRequest, auth_user: Option<&str>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (name, value) in &request.query {
        query.append_pair(name, value);
    }
    if let Some(body) = &request.body {
        query.append_pair("source", &body.to_string());
    }
    let query = query.finish();

    let mut key = String::new();
    if let Some(user) = auth_user {
        key.extend(form_urlencoded::byte_serialize(user.as_bytes()));
        key.push('@');
    }
    key.push_str(&request.path);
    if !query.is_empty() {
        key.push('?');
        key.push_str(&query);
    }
    key
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_LEN && key.bytes().all(|byte| byte.is_ascii_graphic())
}
