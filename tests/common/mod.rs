//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::Response,
    Router,
};
use fhir_proxy::{HttpServer, ProxyConfig, Shutdown};
use tokio::net::TcpListener;

/// What the mock upstream answers for one request.
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn fhir_json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/fhir+json;charset=utf-8",
            body: serde_json::to_vec(body).unwrap(),
            delay: None,
        }
    }

    pub fn raw(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            delay: None,
        }
    }

    /// Hold the response back for `delay` before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path_and_query: String,
    pub headers: HeaderMap,
}

type Responder = dyn Fn(&str) -> MockResponse + Send + Sync;

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    respond: Arc<Responder>,
}

/// A running mock FHIR server.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    /// Base URL of the mock with the given base path, e.g. `/baseR4`.
    pub fn base_url(&self, base_path: &str) -> String {
        format!("http://{}{}", self.addr, base_path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable mock upstream. `respond` receives the path and query
/// of every request.
pub async fn start_fhir_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        requests: requests.clone(),
        respond: Arc::new(respond),
    };

    let app = Router::new().fallback(mock_handler).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, requests }
}

async fn mock_handler(State(state): State<MockState>, request: Request<Body>) -> Response {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.to_string())
        .unwrap_or_default();
    state.requests.lock().unwrap().push(RecordedRequest {
        path_and_query: path_and_query.clone(),
        headers: request.headers().clone(),
    });

    let mock = (state.respond)(&path_and_query);
    if let Some(delay) = mock.delay {
        tokio::time::sleep(delay).await;
    }
    Response::builder()
        .status(StatusCode::from_u16(mock.status).unwrap())
        .header(header::CONTENT_TYPE, mock.content_type)
        .header("x-upstream", "mock")
        .body(Body::from(mock.body))
        .unwrap()
}

/// A proxy running on an ephemeral port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy in front of `upstreams`. The public address is the bound
/// address, so rewritten links are directly reachable.
pub async fn start_proxy(upstreams: Vec<String>) -> RunningProxy {
    let mut config = ProxyConfig::default();
    config.upstreams = upstreams;
    start_proxy_with(config, |config| HttpServer::new(config).unwrap()).await
}

/// Start the proxy with a custom server constructor (e.g. another policy).
pub async fn start_proxy_with<F>(mut config: ProxyConfig, build: F) -> RunningProxy
where
    F: FnOnce(ProxyConfig) -> HttpServer,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();
    config.listener.public_address = Some(addr.to_string());

    let server = build(config);
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningProxy { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
