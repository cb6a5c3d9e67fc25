//! Error types for playlist operations

/// Errors from the YouTube Data API client and playlist use cases.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("YouTube API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("unexpected API response: {0}")]
    Decode(String),

    #[error(transparent)]
    Auth(#[from] youtube_auth::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("playlist {0} has no playable videos")]
    EmptyPlaylist(String),

    #[error("invalid playlist URL: {0}")]
    InvalidUrl(String),

    #[error("unknown sort criteria {0:?} (expected name, duration, publish or language)")]
    InvalidCriteria(String),

    #[error("invalid ISO-8601 duration {0:?}")]
    InvalidDuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether the user has to log in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, Error::Auth(e) if e.requires_login())
    }
}

/// Result alias for playlist operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_surface_login_requirement() {
        let err: Error = youtube_auth::Error::NotFound("no credential".into()).into();
        assert!(err.requires_login());
        assert_eq!(err.to_string(), "not found: no credential");

        let err: Error = youtube_auth::Error::Http("connection reset".into()).into();
        assert!(!err.requires_login());
    }

    #[test]
    fn api_error_display() {
        let err = Error::Api {
            status: 403,
            body: "quotaExceeded".into(),
        };
        assert_eq!(err.to_string(), "YouTube API returned 403: quotaExceeded");
        assert!(!err.requires_login());
    }
}
