use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::{FixtureError, Result};

/// Fixed loopback port for the events webhook.
pub const EVENTS_WEBHOOK_PORT: u16 = 5592;
/// Fixed loopback port for the actions webhook.
pub const ACTIONS_WEBHOOK_PORT: u16 = 5593;
/// Fixed loopback port for the scheduled-trigger events webhook.
pub const SCHEDULED_EVENTS_WEBHOOK_PORT: u16 = 5594;

/// One request the system under test delivered to a webhook server.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
    pub received_at: DateTime<Utc>,
}

#[derive(Clone)]
struct WebhookState {
    requests: Arc<Mutex<VecDeque<RecordedRequest>>>,
    notify: Arc<Notify>,
    response_status: StatusCode,
    response_body: Value,
}

/// A loopback HTTP server scoped to a test group.
///
/// Records every request it receives and answers with a fixed response; the
/// request/response contract belongs to the product under test. [stop]
/// performs a graceful shutdown and joins the serving task, after which the
/// port is free for the next group to bind.
///
/// [stop]: WebhookServer::stop
pub struct WebhookServer {
    addr: SocketAddr,
    state: WebhookState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WebhookServer {
    /// Start a webhook server that answers `200 {}` to everything.
    pub async fn start(port: u16) -> Result<Self> {
        Self::start_with_response(port, StatusCode::OK, json!({})).await
    }

    /// Start a webhook server with a custom canned response.
    pub async fn start_with_response(
        port: u16,
        response_status: StatusCode,
        response_body: Value,
    ) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|e| FixtureError::WebhookBind {
                port,
                reason: e.to_string(),
            })?;
        let addr = listener
            .local_addr()
            .map_err(|e| FixtureError::WebhookBind {
                port,
                reason: e.to_string(),
            })?;

        let state = WebhookState {
            requests: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            response_status,
            response_body,
        };

        let app = Router::new()
            .fallback(capture)
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                debug!(error = %e, "webhook server exited with error");
            }
        });

        info!(%addr, "webhook server listening");
        Ok(Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the next delivered request, in receipt order.
    pub async fn next_request(&self, timeout: Duration) -> Result<RecordedRequest> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(request) = self.state.requests.lock().unwrap().pop_front() {
                return Ok(request);
            }
            let notified = self.state.notify.notified();
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(FixtureError::WebhookTimeout {
                    port: self.addr.port(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    /// Take every request received so far.
    pub fn drain(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().drain(..).collect()
    }

    /// Gracefully shut the server down and join the serving task. When this
    /// returns, no socket is listening on the port anymore.
    pub async fn stop(mut self) {
        let addr = self.addr;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!(%addr, "webhook server stopped");
    }
}

async fn capture(
    State(state): State<WebhookState>,
    uri: Uri,
    body: String,
) -> (StatusCode, Json<Value>) {
    // The body contract belongs to the product under test; record whatever
    // arrives, JSON or not.
    let request = RecordedRequest {
        path: uri.path().to_string(),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
        received_at: Utc::now(),
    };
    debug!(path = %request.path, "webhook request received");

    state.requests.lock().unwrap().push_back(request);
    // notify_one stores a permit, so a delivery landing between the
    // receiver's queue check and its await is not lost.
    state.notify.notify_one();
    (state.response_status, Json(state.response_body.clone()))
}
