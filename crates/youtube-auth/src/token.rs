//! OAuth token endpoint interactions
//!
//! Three calls against the authorization server:
//! 1. Authorization code exchange (login completion)
//! 2. Token refresh (before any authenticated API call with a stale token)
//! 3. Token revocation (logout)
//!
//! Exchange and refresh POST to `token_uri` with different grant types.
//! These functions do not touch the credential store; `AuthService` and
//! `Refresher` decide what gets persisted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client_secret::OAuthConfig;
use crate::credentials::Credential;
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time. A refresh
/// response usually omits `refresh_token`; the previous one stays valid.
#[derive(Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .finish()
    }
}

impl TokenResponse {
    /// Convert to a storable credential, issued at `now`.
    ///
    /// `previous_refresh` is carried over when the response has no refresh
    /// token of its own.
    pub fn into_credential(
        self,
        now: DateTime<Utc>,
        previous_refresh: Option<&str>,
    ) -> Credential {
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(str::to_owned));
        Credential {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token,
            expiry: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + chrono::Duration::seconds(secs as i64)),
        }
    }
}

/// Exchange an authorization code for tokens.
///
/// The user has approved the consent screen and the loopback listener
/// received the code. `redirect_uri` must match the one in the consent URL.
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(config.token_uri.clone())
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}

/// Refresh an access token using a refresh token.
///
/// A 4xx answer or a malformed success body is a rejection
/// (`Error::Refresh`). Failing to reach the provider, a 5xx, or rate
/// limiting (429) is `Error::Http`: the refresh token may still be good.
pub async fn refresh_token(
    client: &reqwest::Client,
    config: &OAuthConfig,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = client
        .post(config.token_uri.clone())
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose().as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::Http(format!(
                "token endpoint unavailable ({status}): {body}"
            )));
        }
        return Err(Error::Refresh(format!(
            "refresh token rejected ({status}): {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::Refresh(format!("invalid refresh response: {e}")))
}

/// Revoke a token at the provider.
///
/// An empty token is a successful no-op. Local storage is untouched.
pub async fn revoke_token(
    client: &reqwest::Client,
    config: &OAuthConfig,
    token: &str,
) -> Result<()> {
    if token.is_empty() {
        debug!("no token to revoke");
        return Ok(());
    }

    let response = client
        .post(config.revoke_uri.clone())
        .form(&[("token", token)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token revocation request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Revoke {
            status: status.as_u16(),
            body,
        });
    }

    debug!("token revoked");
    Ok(())
}
