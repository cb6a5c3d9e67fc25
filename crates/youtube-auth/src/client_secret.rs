//! OAuth client configuration
//!
//! Google issues a JSON client descriptor (`client_secret.json`) with either an
//! `installed` (desktop app) or `web` top-level object. It is read once at
//! startup; any failure here is a `Config` error and fatal to the process.

use std::path::Path;

use common::Secret;
use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::constants::{AUTHORIZE_ENDPOINT, REVOKE_ENDPOINT, TOKEN_ENDPOINT};
use crate::error::{Error, Result};

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientDescriptor>,
    web: Option<ClientDescriptor>,
}

#[derive(Deserialize)]
struct ClientDescriptor {
    client_id: String,
    client_secret: Secret<String>,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Everything needed to talk to the authorization server.
///
/// Constructed once per process and shared by `Arc` through `AuthService`.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub auth_uri: Url,
    pub token_uri: Url,
    pub revoke_uri: Url,
    /// Must match the loopback listener the login flow binds
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Read and validate a client descriptor from disk.
    pub fn from_client_secret_file(
        path: &Path,
        scopes: Vec<String>,
        redirect_uri: String,
    ) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read client secret file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_client_secret_json(&contents, scopes, redirect_uri)?;
        info!(path = %path.display(), client_id = %config.client_id, "loaded OAuth client descriptor");
        Ok(config)
    }

    /// Parse a client descriptor. Prefers the `installed` section when both
    /// are present, since only desktop clients may use loopback redirects.
    pub fn from_client_secret_json(
        json: &str,
        scopes: Vec<String>,
        redirect_uri: String,
    ) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid client secret JSON: {e}")))?;

        let descriptor = file.installed.or(file.web).ok_or_else(|| {
            Error::Config("client secret file has neither an `installed` nor a `web` section".into())
        })?;

        if descriptor.client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        if scopes.is_empty() {
            return Err(Error::Config("at least one OAuth scope is required".into()));
        }
        parse_url("redirect_uri", &redirect_uri)?;

        Ok(Self {
            client_id: descriptor.client_id,
            client_secret: descriptor.client_secret,
            auth_uri: parse_url(
                "auth_uri",
                descriptor.auth_uri.as_deref().unwrap_or(AUTHORIZE_ENDPOINT),
            )?,
            token_uri: parse_url(
                "token_uri",
                descriptor.token_uri.as_deref().unwrap_or(TOKEN_ENDPOINT),
            )?,
            revoke_uri: parse_url("revoke_uri", REVOKE_ENDPOINT)?,
            redirect_uri,
            scopes,
        })
    }

    /// Override the revocation endpoint (configuration or tests).
    pub fn with_revoke_uri(mut self, revoke_uri: &str) -> Result<Self> {
        self.revoke_uri = parse_url("revoke_uri", revoke_uri)?;
        Ok(self)
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("{field} {value:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}
