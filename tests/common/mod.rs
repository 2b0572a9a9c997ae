#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use gqlfix::{BackendTarget, ServerCtx, WorkerTarget};

/// One request the stub engine accepted, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCall {
    pub endpoint: String,
    pub body: Value,
}

#[derive(Clone, Default)]
struct EngineState {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    // Queued response statuses per endpoint; empty queue means 200.
    statuses: Arc<Mutex<HashMap<String, VecDeque<u16>>>>,
}

/// In-process stand-in for the engine under test: accepts the three fixture
/// endpoints, records every call and answers with queued status codes.
pub struct StubEngine {
    addr: SocketAddr,
    state: EngineState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl StubEngine {
    pub async fn start() -> Self {
        let state = EngineState::default();
        let app = Router::new()
            .route("/v1/query", post(legacy_query))
            .route("/v2/query", post(raw_schema))
            .route("/v1/metadata", post(metadata))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue the status the endpoint answers with on its next call. Statuses
    /// are consumed in order; an exhausted queue answers 200.
    pub fn queue_status(&self, endpoint: &str, status: u16) {
        self.state
            .statuses
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(status);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn endpoints_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.endpoint).collect()
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn legacy_query(
    State(state): State<EngineState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    respond(&state, "/v1/query", body)
}

async fn raw_schema(
    State(state): State<EngineState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    respond(&state, "/v2/query", body)
}

async fn metadata(
    State(state): State<EngineState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    respond(&state, "/v1/metadata", body)
}

fn respond(state: &EngineState, endpoint: &str, body: Value) -> (StatusCode, Json<Value>) {
    state.calls.lock().unwrap().push(EngineCall {
        endpoint: endpoint.to_string(),
        body,
    });

    let status = state
        .statuses
        .lock()
        .unwrap()
        .get_mut(endpoint)
        .and_then(|queue| queue.pop_front())
        .unwrap_or(200);
    let status = StatusCode::from_u16(status).unwrap();

    if status == StatusCode::OK {
        (status, Json(json!({ "result": "ok" })))
    } else {
        (status, Json(json!({ "error": "injected failure" })))
    }
}

/// Server context pointing at the stub engine, default backend.
pub fn ctx_for(url: &str) -> ServerCtx {
    ServerCtx::for_target(
        WorkerTarget {
            server_url: url.to_string(),
            database_url: "postgres://stub".to_string(),
        },
        BackendTarget::new("postgres"),
        None,
    )
}

/// Write a marker fixture file; the marker comes back in the posted body so
/// tests can tell which file produced which engine call.
pub fn write_marker(dir: &Path, filename: &str, marker: &str) {
    std::fs::write(
        dir.join(filename),
        format!("type: run_sql\nargs:\n  sql: select '{marker}'\n"),
    )
    .unwrap();
}

/// The marker a recorded engine call carries, if any.
pub fn marker_of(call: &EngineCall) -> String {
    call.body["args"]["sql"]
        .as_str()
        .unwrap_or_default()
        .trim_start_matches("select '")
        .trim_end_matches('\'')
        .to_string()
}
