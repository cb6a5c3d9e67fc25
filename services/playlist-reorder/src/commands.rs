//! Command implementations
//!
//! Each command writes its user-facing output to the given writer (stdout
//! in the binary); diagnostics go through tracing.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use youtube_auth::{
    AuthService, CredentialStore, LoginFlow, LoginOptions, LoginPrompt, OAuthConfig,
    YOUTUBE_SCOPE, loopback_redirect_uri,
};
use youtube_playlists::{Playlist, SortCriteria, YouTubeClient, reorder_playlist, resolve_playlist_ref};

use crate::config::Config;
use crate::error::Error;

/// Everything an authenticated command needs.
pub struct App {
    pub auth: Arc<AuthService>,
    pub youtube: YouTubeClient,
    pub login: LoginOptions,
}

impl App {
    pub fn from_config(config: &Config) -> Result<Self> {
        let redirect_uri =
            loopback_redirect_uri(config.auth.callback_addr, &config.auth.callback_path);
        let mut oauth = OAuthConfig::from_client_secret_file(
            &config.auth.client_secret_file,
            vec![YOUTUBE_SCOPE.to_string()],
            redirect_uri,
        )
        .context("failed to load OAuth client descriptor")?;
        if let Some(ref revoke_url) = config.auth.revoke_url {
            oauth = oauth.with_revoke_uri(revoke_url)?;
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.youtube.timeout())
            .build()
            .context("failed to build HTTP client")?;

        let auth = Arc::new(AuthService::new(
            oauth,
            CredentialStore::new(&config.auth.token_file),
            http_client,
        ));
        let youtube = YouTubeClient::new(auth.clone())
            .with_base_url(&config.youtube.api_base_url)?
            .with_privacy(config.youtube.privacy);

        Ok(Self {
            auth,
            youtube,
            login: LoginOptions {
                callback_addr: config.auth.callback_addr,
                callback_path: config.auth.callback_path.clone(),
                timeout: config.auth.login_timeout(),
            },
        })
    }
}

/// Run the browser login. `launch` tries to open the consent URL; the URL
/// is printed either way so a headless user can copy it.
pub async fn login<W, F>(app: &App, cancel: &CancellationToken, out: &mut W, launch: F) -> Result<()>
where
    W: Write,
    F: FnOnce(&str) -> std::io::Result<()>,
{
    let flow = LoginFlow::new(&app.auth, app.login.clone());
    let mut printed = Ok(());
    let credential = flow
        .run(cancel, |prompt: &LoginPrompt| {
            printed = writeln!(
                out,
                "Open this URL in your browser to sign in:\n\n  {}\n\nWaiting for the redirect to {} ...",
                prompt.authorization_url, prompt.callback_url
            );
            if let Err(e) = launch(prompt.authorization_url.as_str()) {
                warn!(error = %e, "could not open a browser");
            }
        })
        .await
        .context("login failed")?;
    printed?;

    writeln!(
        out,
        "Logged in. Credential saved to {}.",
        app.auth.store().path().display()
    )?;
    if credential.refresh_token().is_none() {
        writeln!(
            out,
            "Warning: Google did not issue a refresh token; you will need to log in again when this one expires."
        )?;
    }
    Ok(())
}

pub async fn logout<W: Write>(app: &App, out: &mut W) -> Result<()> {
    app.auth.logout().await.context("logout failed")?;
    writeln!(out, "Logged out.")?;
    Ok(())
}

/// Report the stored credential without touching the network.
pub async fn status<W: Write>(store: &CredentialStore, out: &mut W) -> Result<()> {
    let credential = match store.load().await {
        Ok(c) => c,
        Err(e) if e.requires_login() => {
            writeln!(out, "Not logged in ({e}).")?;
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to read the saved credential"),
    };

    writeln!(out, "Credential file: {}", store.path().display())?;
    let access = match credential.expiry {
        None if credential.is_fresh() => "valid (no expiry)".to_string(),
        Some(expiry) if credential.is_fresh() => {
            let left = (expiry - Utc::now()).num_minutes();
            format!("valid, expires {} ({left} min)", expiry.to_rfc3339())
        }
        _ => "expired".to_string(),
    };
    writeln!(out, "Access token: {access}")?;
    writeln!(
        out,
        "Refresh token: {}",
        if credential.refresh_token().is_some() {
            "present"
        } else {
            "absent"
        }
    )?;
    Ok(())
}

pub async fn playlists<W: Write>(app: &App, out: &mut W) -> Result<()> {
    let playlists = app
        .youtube
        .my_playlists()
        .await
        .map_err(login_hint)
        .context("failed to list playlists")?;

    if playlists.is_empty() {
        writeln!(out, "No playlists found.")?;
        return Ok(());
    }
    for playlist in &playlists {
        writeln!(out, "{}\t{}", playlist.id, playlist.title)?;
    }
    Ok(())
}

pub async fn show<W: Write>(app: &App, reference: &str, out: &mut W) -> Result<()> {
    let playlist_id = resolve_playlist_ref(reference)?;
    let playlist = app
        .youtube
        .playlist(&playlist_id)
        .await
        .map_err(login_hint)
        .with_context(|| format!("failed to fetch playlist {playlist_id}"))?;
    write_playlist(&playlist, out)?;
    Ok(())
}

pub async fn reorder<W: Write>(
    app: &App,
    playlist_id: &str,
    criteria: SortCriteria,
    title: Option<&str>,
    out: &mut W,
) -> Result<()> {
    let new_id = reorder_playlist(&app.youtube, playlist_id, criteria, title)
        .await
        .map_err(login_hint)
        .with_context(|| format!("failed to reorder playlist {playlist_id}"))?;

    info!(source = playlist_id, new_playlist_id = %new_id, "reorder complete");
    writeln!(
        out,
        "Created playlist sorted by {criteria}: https://www.youtube.com/playlist?list={new_id}"
    )?;
    Ok(())
}

/// Replace login-related failures with an actionable message.
fn login_hint(err: youtube_playlists::Error) -> anyhow::Error {
    if err.requires_login() {
        anyhow::Error::new(Error::LoginRequired).context(err.to_string())
    } else {
        err.into()
    }
}

fn write_playlist<W: Write>(playlist: &Playlist, out: &mut W) -> std::io::Result<()> {
    writeln!(
        out,
        "{} ({}, {} videos, {})",
        playlist.title,
        playlist.id,
        playlist.videos.len(),
        format_duration(playlist.total_duration())
    )?;
    for (i, video) in playlist.videos.iter().enumerate() {
        let language = if video.language.is_empty() {
            "-"
        } else {
            video.language.as_str()
        };
        writeln!(
            out,
            "{:>4}. {:>8}  {}  {:<5}  {} - {}",
            i + 1,
            format_duration(video.duration),
            video.published_at.format("%Y-%m-%d"),
            language,
            video.artist,
            video.title
        )?;
    }
    Ok(())
}

/// `H:MM:SS` for an hour or more, `M:SS` otherwise.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
