//! Error types for OAuth authentication operations

use std::time::Duration;

/// Errors from OAuth authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("client configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("token refresh failed: {0}")]
    Refresh(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("token revocation failed ({status}): {body}")]
    Revoke { status: u16, body: String },

    #[error("authorization callback failed: {0}")]
    Callback(#[from] CallbackError),

    #[error("login cancelled")]
    Cancelled,

    #[error("login timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
}

impl Error {
    /// Whether the only way forward is a fresh interactive login.
    ///
    /// True when there is no usable credential on disk: never stored,
    /// semantically empty, or deleted after the provider rejected a refresh.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidCredential(_) | Error::Refresh(_)
        )
    }
}

/// Why a loopback callback did not yield an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("state parameter mismatch (received {received:?})")]
    StateMismatch { received: String },

    #[error("authorization denied by provider: {error}{}", describe(.description))]
    Provider {
        error: String,
        description: Option<String>,
    },

    #[error("authorization code missing from callback")]
    MissingCode,

    #[error("callback listener failed: {0}")]
    Startup(String),
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(d) => format!(" - {d}"),
        None => String::new(),
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
