#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use serde_json::{json, Value as JsonValue};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
};

#[derive(Clone)]
pub struct MockResponse {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockResponse {
    pub fn json(status: StatusCode, body: JsonValue) -> Self {
        Self::raw(status, body.to_string())
    }

    pub fn raw(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::from_millis(0),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::raw(status, "")
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
}

impl RecordedRequest {
    pub fn json_body(&self) -> JsonValue {
        serde_json::from_str(&self.body).expect("request body must be JSON")
    }
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    hits: Arc<AtomicUsize>,
}

async fn store_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_owned(),
            query: uri.query().map(str::to_owned),
            body,
            content_type: header_text(header::CONTENT_TYPE),
            authorization: header_text(header::AUTHORIZATION),
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (
        response.status,
        [(header::CONTENT_TYPE, "application/json")],
        response.body,
    )
}

pub struct MockStore {
    pub port: u16,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for MockStore {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MockStore {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }

    /// `METHOD /path` for every request received, in order.
    pub fn request_lines(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| format!("{} {}", request.method, request.path))
            .collect()
    }
}

pub async fn spawn_store(responses: Vec<MockResponse>) -> MockStore {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .fallback(store_handler)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let port = listener.local_addr().expect("must have local addr").port();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock store must run");
    });

    MockStore {
        port,
        hits: state.hits,
        requests: state.requests,
        task,
    }
}

/// Returns a local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind probe listener");
    listener.local_addr().expect("must have local addr").port()
}

/// Minimal memcached speaking the text protocol `get` command.
pub struct FakeMemcached {
    pub port: u16,
    commands: Arc<Mutex<Vec<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for FakeMemcached {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FakeMemcached {
    /// Every command line received, e.g. `get /i/apples/1`.
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .expect("command log mutex must not be poisoned")
            .clone()
    }
}

pub async fn spawn_memcached(entries: HashMap<String, String>) -> FakeMemcached {
    spawn_memcached_with(move |key| match entries.get(key) {
        Some(value) => format!("VALUE {key} 0 {}\r\n{value}\r\nEND\r\n", value.len()),
        None => "END\r\n".to_owned(),
    })
    .await
}

/// Answers every `get` with `reply` verbatim, well-formed or not.
pub async fn spawn_memcached_raw(reply: &str) -> FakeMemcached {
    let reply = reply.to_owned();
    spawn_memcached_with(move |_| reply.clone()).await
}

async fn spawn_memcached_with<F>(respond: F) -> FakeMemcached
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind memcached listener");
    let port = listener.local_addr().expect("must have local addr").port();
    let commands = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = commands.clone();
    let task = tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let log = log.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    log.lock()
                        .expect("command log mutex must not be poisoned")
                        .push(line.clone());

                    let reply = match line.strip_prefix("get ") {
                        Some(key) => respond(key),
                        None => "ERROR\r\n".to_owned(),
                    };
                    if write_half.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    FakeMemcached {
        port,
        commands,
        task,
    }
}
