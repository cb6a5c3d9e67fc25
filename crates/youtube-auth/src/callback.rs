//! Loopback listener for the OAuth redirect
//!
//! One listener per login attempt. It accepts exactly one callback on the
//! configured path, checks the CSRF state, and hands the outcome to the
//! caller over an mpsc channel. After that (or on cancellation) it shuts
//! itself down, giving in-flight requests `CALLBACK_SHUTDOWN_GRACE` to
//! finish.
//!
//! Lifecycle: `Listening` -> `Delivered` | `Cancelled` -> `Stopped`.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::CALLBACK_SHUTDOWN_GRACE;
use crate::error::{CallbackError, Error, Result};

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>playlist-reorder</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Authentication complete</h2>
<p>You can close this tab and return to the terminal.</p>
</body>
</html>"#;

/// What the listener reports for a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    AuthorizationCode(String),
    Error(CallbackError),
}

impl CallbackResult {
    /// HTTP status the browser sees for this outcome.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CallbackResult::AuthorizationCode(_) => StatusCode::OK,
            CallbackResult::Error(CallbackError::Provider { .. }) => StatusCode::UNAUTHORIZED,
            CallbackResult::Error(CallbackError::StateMismatch { .. })
            | CallbackResult::Error(CallbackError::MissingCode) => StatusCode::BAD_REQUEST,
            CallbackResult::Error(CallbackError::Startup(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Listening,
    Delivered,
    Cancelled,
    Stopped,
}

struct CallbackState {
    expected_state: String,
    /// Taken by whoever delivers first; `None` afterwards.
    delivery: Mutex<Option<mpsc::Sender<CallbackResult>>>,
    /// Cancelled once a result has been delivered.
    done: CancellationToken,
    phase: watch::Sender<CallbackPhase>,
}

impl CallbackState {
    fn new(
        expected_state: String,
        results: mpsc::Sender<CallbackResult>,
        phase: watch::Sender<CallbackPhase>,
    ) -> Self {
        Self {
            expected_state,
            delivery: Mutex::new(Some(results)),
            done: CancellationToken::new(),
            phase,
        }
    }

    /// Move out of `Listening`; later transitions are ignored.
    fn settle(&self, next: CallbackPhase) -> bool {
        self.phase.send_if_modified(|phase| {
            if *phase == CallbackPhase::Listening {
                *phase = next;
                true
            } else {
                false
            }
        })
    }

    /// Deliver `result` if nothing has been delivered yet.
    async fn deliver(&self, result: CallbackResult) -> bool {
        let Some(sender) = self.delivery.lock().await.take() else {
            return false;
        };
        if sender.try_send(result).is_err() {
            warn!("callback result dropped, receiver is gone or full");
        }
        self.settle(CallbackPhase::Delivered);
        self.done.cancel();
        true
    }
}

/// Handle to a running loopback listener.
pub struct CallbackServer {
    local_addr: SocketAddr,
    stop: CancellationToken,
    phase: watch::Receiver<CallbackPhase>,
    watcher: JoinHandle<CallbackPhase>,
}

impl CallbackServer {
    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn phase(&self) -> CallbackPhase {
        *self.phase.borrow()
    }

    /// Ask the listener to stop. Safe to call any number of times.
    pub fn shutdown(&self) {
        self.stop.cancel();
    }

    /// Wait until the listener has fully stopped.
    ///
    /// Returns how the attempt ended: `Delivered` or `Cancelled`.
    pub async fn stopped(self) -> CallbackPhase {
        match self.watcher.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "callback watcher task failed");
                CallbackPhase::Cancelled
            }
        }
    }
}

/// Start a loopback listener for one authorization callback.
///
/// Binds `addr` and serves `path`. The first request on `path` is evaluated
/// and its outcome sent on `results`; every later request gets 409. The
/// listener stops after that delivery, when `cancel` fires, or when
/// `CallbackServer::shutdown` is called, and then drops `results`.
///
/// A bind failure is returned and also pushed onto `results` (best effort)
/// as `CallbackError::Startup`.
pub async fn listen_and_serve(
    cancel: CancellationToken,
    expected_state: impl Into<String>,
    addr: SocketAddr,
    path: &str,
    results: mpsc::Sender<CallbackResult>,
) -> Result<CallbackServer> {
    if !path.starts_with('/') {
        return Err(Error::Config(format!(
            "callback path must start with '/', got {path:?}"
        )));
    }

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => return Err(startup_failure(&results, format!("binding {addr}: {e}"))),
    };
    let local_addr = match listener.local_addr() {
        Ok(a) => a,
        Err(e) => return Err(startup_failure(&results, format!("resolving bound address: {e}"))),
    };

    let (phase_tx, phase_rx) = watch::channel(CallbackPhase::Listening);
    let state = Arc::new(CallbackState::new(expected_state.into(), results, phase_tx));
    let app = router(state.clone(), path);

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        let state = state.clone();
        async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = serve.await {
                warn!(error = %e, "callback listener failed");
                state
                    .deliver(CallbackResult::Error(CallbackError::Startup(e.to_string())))
                    .await;
            }
        }
    });

    let stop = cancel.child_token();
    let watcher = tokio::spawn({
        let stop = stop.clone();
        async move {
            tokio::select! {
                biased;
                _ = state.done.cancelled() => {}
                _ = stop.cancelled() => {
                    if state.settle(CallbackPhase::Cancelled) {
                        debug!("callback listener cancelled before any callback");
                    }
                }
            }
            let outcome = *state.phase.borrow();

            shutdown.cancel();
            if tokio::time::timeout(CALLBACK_SHUTDOWN_GRACE, &mut server)
                .await
                .is_err()
            {
                warn!(
                    grace_secs = CALLBACK_SHUTDOWN_GRACE.as_secs(),
                    "callback listener did not drain in time, aborting"
                );
                server.abort();
            }

            // Close the results channel for a caller still waiting on it
            state.delivery.lock().await.take();
            state.phase.send_replace(CallbackPhase::Stopped);
            debug!(?outcome, "callback listener stopped");
            outcome
        }
    });

    info!(%local_addr, "callback listener started");
    Ok(CallbackServer {
        local_addr,
        stop,
        phase: phase_rx,
        watcher,
    })
}

fn startup_failure(results: &mpsc::Sender<CallbackResult>, message: String) -> Error {
    warn!(error = %message, "callback listener failed to start");
    let error = CallbackError::Startup(message);
    // Nobody may be receiving yet; never block here
    let _ = results.try_send(CallbackResult::Error(error.clone()));
    Error::Callback(error)
}

fn router(state: Arc<CallbackState>, path: &str) -> Router {
    Router::new()
        .route(path, get(handle_callback))
        .with_state(state)
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> Response {
    let params: HashMap<String, String> = match query {
        Some(q) => {
            let mut params = HashMap::new();
            for (key, value) in url::form_urlencoded::parse(q.as_bytes()) {
                params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
            params
        }
        None => HashMap::new(),
    };

    let result = evaluate(&state.expected_state, &params);
    let status = result.status_code();
    let response = match &result {
        CallbackResult::AuthorizationCode(_) => (status, Html(SUCCESS_PAGE)).into_response(),
        CallbackResult::Error(e) => (status, e.to_string()).into_response(),
    };

    if !state.deliver(result).await {
        debug!("duplicate callback rejected");
        return (
            StatusCode::CONFLICT,
            "authorization callback already handled",
        )
            .into_response();
    }

    if status == StatusCode::OK {
        info!("authorization code received");
    } else {
        warn!(%status, "authorization callback rejected");
    }
    response
}

/// Classify a callback's query parameters.
///
/// Checked in order: state, provider error, code.
fn evaluate(expected_state: &str, params: &HashMap<String, String>) -> CallbackResult {
    let received = params.get("state").map(String::as_str).unwrap_or_default();
    if received != expected_state {
        return CallbackResult::Error(CallbackError::StateMismatch {
            received: received.to_string(),
        });
    }

    if let Some(error) = params.get("error").filter(|e| !e.is_empty()) {
        return CallbackResult::Error(CallbackError::Provider {
            error: error.clone(),
            description: params
                .get("error_description")
                .filter(|d| !d.is_empty())
                .cloned(),
        });
    }

    match params.get("code").filter(|c| !c.is_empty()) {
        Some(code) => CallbackResult::AuthorizationCode(code.clone()),
        None => CallbackResult::Error(CallbackError::MissingCode),
    }
}
