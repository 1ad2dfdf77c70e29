//! In-process test harness: a relay server bound to an ephemeral port plus a
//! mock upstream that records what the relay forwards.

use axum::Router;
use axum::body::Body;
use axum::extract::Extension;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use futures::StreamExt;
use marine_relay::{AppState, Config, UpstreamClient, app};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TEST_API_KEY: &str = "test-api-key";

/// One upload as observed by the mock upstream.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub api_key: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body_len: u64,
    /// False when the relay aborted the body mid-stream
    pub body_complete: bool,
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Json(serde_json::Value),
    Status(u16),
}

#[derive(Clone)]
pub struct MockUpstream {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedUpload>>>,
    response: Arc<Mutex<MockResponse>>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mock = Self {
            addr: listener.local_addr().unwrap(),
            received: Arc::new(Mutex::new(Vec::new())),
            response: Arc::new(Mutex::new(MockResponse::Json(json!({ "id": "vid-1" })))),
        };

        let router = Router::new()
            .route("/upload", post(receive_upload))
            .layer(Extension(mock.clone()));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        mock
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond_with(&self, response: MockResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn uploads(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn last_upload(&self) -> Option<ReceivedUpload> {
        self.received.lock().unwrap().last().cloned()
    }
}

async fn receive_upload(
    Extension(mock): Extension<MockUpstream>,
    req: Request<Body>,
) -> Response {
    let headers = req.headers().clone();
    let mut body = req.into_body().into_data_stream();

    let mut body_len = 0u64;
    let mut body_complete = true;
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => body_len += chunk.len() as u64,
            Err(_) => {
                body_complete = false;
                break;
            }
        }
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    mock.received.lock().unwrap().push(ReceivedUpload {
        api_key: header("X-API-Key"),
        file_name: header("X-File-Name"),
        content_type: header("Content-Type"),
        body_len,
        body_complete,
    });

    let response = mock.response.lock().unwrap().clone();
    match response {
        MockResponse::Json(value) => (StatusCode::OK, Json(value)).into_response(),
        MockResponse::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
    }
}

/// Relay server under test.
pub struct TestServer {
    addr: SocketAddr,
    pub upstream: MockUpstream,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_cap(64 * 1024 * 1024).await
    }

    pub async fn start_with_cap(max_upload_bytes: u64) -> Self {
        let upstream = MockUpstream::start().await;
        let addr = serve_relay(upstream.url(), max_upload_bytes).await;
        Self { addr, upstream }
    }

    /// A relay whose upstream address has nothing listening on it.
    pub async fn start_with_unreachable_upstream() -> Self {
        let upstream = MockUpstream::start().await;

        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap();
        drop(dead);

        let addr = serve_relay(format!("http://{dead_addr}"), 64 * 1024 * 1024).await;
        Self { addr, upstream }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }
}

async fn serve_relay(upstream_url: String, max_upload_bytes: u64) -> SocketAddr {
    let config = Config {
        upstream_url,
        upstream_api_key: TEST_API_KEY.into(),
        max_upload_bytes,
        ..Default::default()
    };
    config.validate().expect("test config should be valid");

    let upstream = UpstreamClient::from_config(&config).unwrap();
    let state = AppState::new(upstream, config.max_upload_bytes);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    addr
}
