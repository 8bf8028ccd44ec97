//! Test utilities for jars-core
//!
//! This module provides a mock API Gateway server that can be used for
//! integration tests of the gateway client, the relay routes and the
//! client-side API wrapper.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// A request as seen by the mock gateway
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    /// Canned status and body; `None` echoes the request
    canned: Option<(u16, Value)>,
    /// Canned responses keyed by request path
    routes: HashMap<String, (u16, Value)>,
    requests: Vec<RecordedRequest>,
}

/// Mock API Gateway for testing
///
/// By default every request is answered with `200` and a JSON echo of the
/// request: `{method, path, query, authorization, body}`.
pub struct MockGateway {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGateway {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .fallback(handle_any)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer every request with this status and body
    pub fn respond_with(&self, status: u16, body: Value) {
        self.state.lock().unwrap().canned = Some((status, body));
    }

    /// Answer requests to one path with this status and body
    pub fn respond_to(&self, path: &str, status: u16, body: Value) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), (status, body));
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGateway {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_any(
    State(state): State<Arc<Mutex<MockState>>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let request = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let mut state = state.lock().unwrap();
    state.requests.push(request.clone());

    let (status, body) = match state.routes.get(&request.path).or(state.canned.as_ref()) {
        Some((status, body)) => (*status, body.clone()),
        None => (
            200,
            json!({
                "method": request.method,
                "path": request.path,
                "query": request.query,
                "authorization": request.authorization,
                "body": request.body,
            }),
        ),
    };

    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}
