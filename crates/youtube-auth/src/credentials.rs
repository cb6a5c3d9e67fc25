//! Credential storage for the OAuth token
//!
//! Single-slot JSON file holding the one credential this user has. All writes
//! use atomic temp-file + rename to prevent a half-written token on crash. A
//! tokio Mutex serializes file operations within the process; concurrent
//! logins or refreshes from separate processes are not supported.
//!
//! The on-disk shape matches the token files written by Google's client
//! libraries (`access_token`, `token_type`, `refresh_token`, `expiry`), so an
//! existing `token.json` keeps working.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::constants::EXPIRY_SKEW;
use crate::error::{Error, Result};

/// The user's OAuth credential.
///
/// Usable only if at least one of `access_token` or `refresh_token` is
/// non-empty. The store refuses to persist or return anything else.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API calls
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Long-lived token for minting new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry of `access_token`; `None` means it does not expire
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_expiry"
    )]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Refresh token, if one was issued and is non-empty.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether the credential can still be turned into an access token.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() || self.refresh_token().is_some()
    }

    /// Whether the access token can be used as-is at `now`.
    ///
    /// Tokens within `EXPIRY_SKEW` of their expiry count as expired so a
    /// request does not race the deadline.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expiry {
            None => true,
            Some(expiry) => {
                let skew = chrono::Duration::seconds(EXPIRY_SKEW.as_secs() as i64);
                expiry - skew > now
            }
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &redact(&self.access_token))
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}

fn redact(token: &str) -> &'static str {
    if token.is_empty() { "" } else { "[REDACTED]" }
}

/// Go-style writers store "no expiry" as the zero time (year 1).
fn deserialize_expiry<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|e| e.year() > 1))
}

/// Single-slot credential file manager.
pub struct CredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store backed by `path`. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored credential.
    ///
    /// Fails with `NotFound` if there is no file, `CredentialParse` if it
    /// cannot be decoded, and `InvalidCredential` if both tokens are empty.
    pub async fn load(&self) -> Result<Credential> {
        let _guard = self.lock.lock().await;

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!(
                    "no credential at {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(Error::Io(format!("reading credential file: {e}"))),
        };

        let credential: Credential = serde_json::from_str(&contents)
            .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;

        if !credential.is_usable() {
            return Err(Error::InvalidCredential(
                "stored credential has neither an access token nor a refresh token".into(),
            ));
        }

        debug!(path = %self.path.display(), "loaded credential");
        Ok(credential)
    }

    /// Replace the stored credential.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        if !credential.is_usable() {
            return Err(Error::InvalidCredential(
                "refusing to store a credential with neither an access token nor a refresh token"
                    .into(),
            ));
        }

        let _guard = self.lock.lock().await;
        write_atomic(&self.path, credential).await
    }

    /// Remove the stored credential. Already absent is not an error.
    pub async fn delete(&self) -> Result<()> {
        let _guard = self.lock.lock().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "deleted local credential");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing credential file: {e}"))),
        }
    }
}

/// Write the credential to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains OAuth tokens.
async fn write_atomic(path: &Path, credential: &Credential) -> Result<()> {
    let json = serde_json::to_string_pretty(credential)
        .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Io(format!("creating credential directory: {e}")))?;

    let tmp_path = dir.join(format!(".credential.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential");
    Ok(())
}
