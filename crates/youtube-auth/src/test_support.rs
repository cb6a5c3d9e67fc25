//! Local stand-in for Google's token and revoke endpoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;

use crate::client_secret::OAuthConfig;
use crate::constants::YOUTUBE_SCOPE;

struct MockState {
    token_status: Mutex<StatusCode>,
    token_body: Mutex<serde_json::Value>,
    revoke_status: Mutex<StatusCode>,
    token_forms: Mutex<Vec<HashMap<String, String>>>,
    revoke_forms: Mutex<Vec<HashMap<String, String>>>,
    token_calls: Arc<AtomicUsize>,
    revoke_calls: Arc<AtomicUsize>,
}

pub(crate) struct MockOAuth {
    pub base: String,
    pub token_calls: Arc<AtomicUsize>,
    pub revoke_calls: Arc<AtomicUsize>,
    state: Arc<MockState>,
}

impl MockOAuth {
    /// Serve `/token` with the given response and `/revoke` with 200.
    pub async fn spawn(token_status: StatusCode, token_body: serde_json::Value) -> Self {
        let token_calls = Arc::new(AtomicUsize::new(0));
        let revoke_calls = Arc::new(AtomicUsize::new(0));
        let state = Arc::new(MockState {
            token_status: Mutex::new(token_status),
            token_body: Mutex::new(token_body),
            revoke_status: Mutex::new(StatusCode::OK),
            token_forms: Mutex::new(Vec::new()),
            revoke_forms: Mutex::new(Vec::new()),
            token_calls: token_calls.clone(),
            revoke_calls: revoke_calls.clone(),
        });

        let app = Router::new()
            .route("/token", post(token_handler))
            .route("/revoke", post(revoke_handler))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            token_calls,
            revoke_calls,
            state,
        }
    }

    pub fn with_revoke_status(self, status: StatusCode) -> Self {
        *self.state.revoke_status.lock().unwrap() = status;
        self
    }

    pub fn config(&self) -> OAuthConfig {
        config_for(&self.base)
    }

    pub async fn last_token_form(&self) -> HashMap<String, String> {
        self.state
            .token_forms
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no token request recorded")
    }

    pub async fn last_revoke_form(&self) -> HashMap<String, String> {
        self.state
            .revoke_forms
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no revoke request recorded")
    }
}

async fn token_handler(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    state.token_forms.lock().unwrap().push(form);
    let status = *state.token_status.lock().unwrap();
    let body = state.token_body.lock().unwrap().clone();
    (status, Json(body))
}

async fn revoke_handler(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> StatusCode {
    state.revoke_calls.fetch_add(1, Ordering::SeqCst);
    state.revoke_forms.lock().unwrap().push(form);
    *state.revoke_status.lock().unwrap()
}

/// Client configuration whose endpoints all live under `base`.
pub(crate) fn config_for(base: &str) -> OAuthConfig {
    let descriptor = serde_json::json!({
        "installed": {
            "client_id": "test-client",
            "client_secret": "test-secret",
            "auth_uri": format!("{base}/auth"),
            "token_uri": format!("{base}/token"),
        }
    });
    OAuthConfig::from_client_secret_json(
        &descriptor.to_string(),
        vec![YOUTUBE_SCOPE.to_string()],
        "http://localhost:8080".into(),
    )
    .unwrap()
    .with_revoke_uri(&format!("{base}/revoke"))
    .unwrap()
}

/// A typical token endpoint success body.
pub(crate) fn token_json(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "expires_in": 3599,
        "token_type": "Bearer",
        "scope": YOUTUBE_SCOPE,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::String(refresh.to_string());
    }
    body
}
