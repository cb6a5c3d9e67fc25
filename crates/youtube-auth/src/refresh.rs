//! Request-time token refresh
//!
//! Every authenticated call goes through `Refresher::valid_credential()`,
//! which hands back a credential whose access token is usable right now.
//! A credential the provider refuses to refresh is deleted from disk: the
//! caller must go back through interactive login rather than retry a dead
//! refresh token forever.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client_secret::OAuthConfig;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{Error, Result};
use crate::token;

/// Wraps the credential store with the provider's refresh semantics.
pub struct Refresher {
    store: Arc<CredentialStore>,
    config: Arc<OAuthConfig>,
    http_client: reqwest::Client,
}

impl Refresher {
    pub fn new(
        store: Arc<CredentialStore>,
        config: Arc<OAuthConfig>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            store,
            config,
            http_client,
        }
    }

    /// Load the stored credential and make sure its access token is usable.
    ///
    /// Returns the credential and whether a refresh round trip happened.
    /// Load errors propagate unchanged. A rejected refresh deletes the local
    /// credential and fails with `Error::Refresh`; a transport failure or a
    /// provider outage (`Error::Http`) leaves it in place for the next attempt.
    pub async fn valid_credential(&self) -> Result<(Credential, bool)> {
        let current = self.store.load().await?;

        if current.is_fresh() {
            debug!("stored access token still valid");
            return Ok((current, false));
        }

        let Some(refresh) = current.refresh_token() else {
            return Err(self
                .invalidate("access token expired and no refresh token is stored".into())
                .await);
        };

        debug!("access token expired or expiring, refreshing");
        let response = match token::refresh_token(&self.http_client, &self.config, refresh).await
        {
            Ok(r) => r,
            Err(Error::Refresh(cause)) => return Err(self.invalidate(cause).await),
            Err(e) => {
                warn!(error = %e, "token refresh did not reach the provider, keeping credential");
                return Err(e);
            }
        };

        let mut refreshed = response.into_credential(Utc::now(), current.refresh_token());
        if refreshed.token_type.is_none() {
            refreshed.token_type = current.token_type.clone();
        }

        let changed = refreshed.access_token != current.access_token
            || refreshed.refresh_token != current.refresh_token
            || refreshed.expiry != current.expiry;
        if changed {
            self.store.save(&refreshed).await?;
            info!(
                rotated_refresh_token = refreshed.refresh_token != current.refresh_token,
                "refreshed credential persisted"
            );
        }

        Ok((refreshed, true))
    }

    /// Delete the local credential and build the error that reports why.
    async fn invalidate(&self, cause: String) -> Error {
        warn!(error = %cause, "credential cannot be refreshed, deleting it");
        if let Err(e) = self.store.delete().await {
            warn!(error = %e, "failed to delete unrefreshable credential");
        }
        Error::Refresh(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockOAuth, config_for, token_json};
    use axum::http::StatusCode;
    use std::sync::atomic::Ordering;

    fn refresher(dir: &tempfile::TempDir, config: OAuthConfig) -> (Refresher, Arc<CredentialStore>) {
        let store = Arc::new(CredentialStore::new(dir.path().join("token.json")));
        let refresher = Refresher::new(store.clone(), Arc::new(config), reqwest::Client::new());
        (refresher, store)
    }

    fn credential(access: &str, refresh: Option<&str>, expires_in_secs: i64) -> Credential {
        Credential {
            access_token: access.into(),
            token_type: Some("Bearer".into()),
            refresh_token: refresh.map(str::to_owned),
            expiry: Some(Utc::now() + chrono::Duration::seconds(expires_in_secs)),
        }
    }

    #[tokio::test]
    async fn fresh_credential_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOAuth::spawn(StatusCode::OK, token_json("at_new", None)).await;
        let (refresher, store) = refresher(&dir, mock.config());
        let stored = credential("at_live", Some("rt"), 3600);
        store.save(&stored).await.unwrap();

        let (cred, refreshed) = refresher.valid_credential().await.unwrap();
        assert!(!refreshed);
        assert_eq!(cred, stored);
        assert_eq!(mock.token_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOAuth::spawn(StatusCode::OK, token_json("at_new", None)).await;
        let (refresher, store) = refresher(&dir, mock.config());
        store
            .save(&credential("at_old", Some("rt_keep"), -60))
            .await
            .unwrap();

        let (cred, refreshed) = refresher.valid_credential().await.unwrap();
        assert!(refreshed);
        assert_eq!(cred.access_token, "at_new");
        assert_eq!(cred.refresh_token.as_deref(), Some("rt_keep"));
        assert!(cred.is_fresh());

        let on_disk = store.load().await.unwrap();
        assert_eq!(on_disk, cred, "refreshed credential must be written back");
        assert_eq!(mock.last_token_form().await["refresh_token"], "rt_keep");
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOAuth::spawn(StatusCode::OK, token_json("at_new", Some("rt_rotated"))).await;
        let (refresher, store) = refresher(&dir, mock.config());
        store
            .save(&credential("at_old", Some("rt_old"), -60))
            .await
            .unwrap();

        refresher.valid_credential().await.unwrap();
        assert_eq!(
            store.load().await.unwrap().refresh_token.as_deref(),
            Some("rt_rotated")
        );
    }

    #[tokio::test]
    async fn expiry_only_change_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        // Provider hands back the same access token with a later expiry
        let mock = MockOAuth::spawn(StatusCode::OK, token_json("at_same", None)).await;
        let (refresher, store) = refresher(&dir, mock.config());
        let stale = credential("at_same", Some("rt"), 5);
        store.save(&stale).await.unwrap();

        let (cred, refreshed) = refresher.valid_credential().await.unwrap();
        assert!(refreshed);
        assert_eq!(cred.access_token, "at_same");

        let on_disk = store.load().await.unwrap();
        assert_ne!(on_disk.expiry, stale.expiry, "new expiry must reach disk");
        assert_eq!(on_disk.expiry, cred.expiry);
    }

    #[tokio::test]
    async fn rejected_refresh_deletes_credential() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOAuth::spawn(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error":"invalid_grant"}),
        )
        .await;
        let (refresher, store) = refresher(&dir, mock.config());
        store
            .save(&credential("at_old", Some("rt_revoked"), -60))
            .await
            .unwrap();

        let err = refresher.valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::Refresh(_)), "got {err:?}");
        assert!(err.to_string().contains("invalid_grant"));
        assert!(
            matches!(store.load().await, Err(Error::NotFound(_))),
            "refresh failure must leave no credential behind"
        );
    }

    #[tokio::test]
    async fn malformed_refresh_response_deletes_credential() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOAuth::spawn(StatusCode::OK, serde_json::json!({"unexpected": true})).await;
        let (refresher, store) = refresher(&dir, mock.config());
        store
            .save(&credential("at_old", Some("rt"), -60))
            .await
            .unwrap();

        let err = refresher.valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::Refresh(_)), "got {err:?}");
        assert!(matches!(store.load().await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_is_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, store) = refresher(&dir, config_for("http://127.0.0.1:1"));
        store.save(&credential("at_old", None, -60)).await.unwrap();

        let err = refresher.valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::Refresh(_)));
        assert!(matches!(store.load().await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn unreachable_provider_keeps_credential() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, store) = refresher(&dir, config_for("http://127.0.0.1:1"));
        let stored = credential("at_old", Some("rt"), -60);
        store.save(&stored).await.unwrap();

        let err = refresher.valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got {err:?}");
        assert_eq!(store.load().await.unwrap(), stored);
    }

    #[tokio::test]
    async fn provider_outage_keeps_credential() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockOAuth::spawn(
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({"error":"backend"}),
        )
        .await;
        let (refresher, store) = refresher(&dir, mock.config());
        let stored = credential("at_old", Some("rt"), -60);
        store.save(&stored).await.unwrap();

        let err = refresher.valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got {err:?}");
        assert_eq!(mock.token_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().await.unwrap(), stored);
    }

    #[tokio::test]
    async fn missing_credential_propagates_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (refresher, _store) = refresher(&dir, config_for("http://127.0.0.1:1"));

        let err = refresher.valid_credential().await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.requires_login());
    }
}
