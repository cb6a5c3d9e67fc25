//! Facade tying configuration, storage and the token endpoint together

use std::sync::Arc;

use chrono::Utc;
use reqwest::{Method, RequestBuilder};
use tracing::{info, warn};
use url::Url;

use crate::authorize::build_authorization_url;
use crate::client_secret::OAuthConfig;
use crate::credentials::{Credential, CredentialStore};
use crate::error::Result;
use crate::refresh::Refresher;
use crate::token;

/// Authentication entry point used by the CLI and API clients.
pub struct AuthService {
    config: Arc<OAuthConfig>,
    store: Arc<CredentialStore>,
    refresher: Refresher,
    http_client: reqwest::Client,
}

impl AuthService {
    pub fn new(config: OAuthConfig, store: CredentialStore, http_client: reqwest::Client) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let refresher = Refresher::new(store.clone(), config.clone(), http_client.clone());
        Self {
            config,
            store,
            refresher,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Consent URL for this client and `state`.
    pub fn authorization_url(&self, state: &str) -> Url {
        build_authorization_url(&self.config, state)
    }

    /// Trade an authorization code for a credential and persist it.
    ///
    /// The credential is on disk before this returns.
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        self.exchange_code_with(&self.config, code).await
    }

    /// Same as `exchange_code`, against a config whose redirect URI was
    /// fixed after the listener bound its port.
    pub(crate) async fn exchange_code_with(
        &self,
        config: &OAuthConfig,
        code: &str,
    ) -> Result<Credential> {
        let response = token::exchange_code(&self.http_client, config, code).await?;
        let credential = response.into_credential(Utc::now(), None);
        self.store.save(&credential).await?;
        info!(
            has_refresh_token = credential.refresh_token().is_some(),
            "authorization code exchanged, credential stored"
        );
        Ok(credential)
    }

    /// Revoke `token` at the provider. Local storage is untouched.
    pub async fn revoke_token(&self, token: &str) -> Result<()> {
        token::revoke_token(&self.http_client, &self.config, token).await
    }

    /// HTTP client carrying a currently valid access token.
    ///
    /// Refreshes (and persists) the credential first if needed.
    pub async fn authenticated_client(&self) -> Result<AuthenticatedClient> {
        let (credential, _refreshed) = self.refresher.valid_credential().await?;
        Ok(AuthenticatedClient {
            http_client: self.http_client.clone(),
            credential,
        })
    }

    /// Revoke the stored credential upstream, then delete it locally.
    ///
    /// Revocation failure is logged and does not stop the local delete.
    /// Nothing stored is not an error.
    pub async fn logout(&self) -> Result<()> {
        let credential = match self.store.load().await {
            Ok(c) => Some(c),
            Err(e) if e.requires_login() => None,
            Err(e) => {
                warn!(error = %e, "stored credential unreadable, deleting without revoking");
                None
            }
        };

        if let Some(credential) = credential {
            // Revoking the refresh token also invalidates its access tokens
            let token = credential
                .refresh_token()
                .unwrap_or(credential.access_token.as_str());
            if let Err(e) = self.revoke_token(token).await {
                warn!(error = %e, "token revocation failed, deleting local credential anyway");
            }
        }

        self.store.delete().await?;
        info!("logged out");
        Ok(())
    }
}

/// Bearer-authenticated request builder.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    http_client: reqwest::Client,
    credential: Credential,
}

impl AuthenticatedClient {
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(&self.credential.access_token)
    }

    pub fn get(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn delete(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }
}
