//! playlist-reorder
//!
//! Signs in to YouTube with a browser-based Google OAuth login and saves
//! reordered copies of the user's playlists.

mod cli;
mod commands;
mod config;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use youtube_auth::CredentialStore;

use crate::cli::{Cli, Command};
use crate::commands::App;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // JSON logs on stderr; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = Config::resolve_path(cli.config.as_deref());
    debug!(path = %config_path.display(), "loading configuration");
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let mut stdout = std::io::stdout().lock();

    // Status needs neither the client descriptor nor the network
    if cli.command == Command::Status {
        let store = CredentialStore::new(&config.auth.token_file);
        return commands::status(&store, &mut stdout).await;
    }

    let app = App::from_config(&config)?;
    info!(command = ?cli.command, "running command");

    match cli.command {
        Command::Login => {
            let cancel = CancellationToken::new();
            let signal = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    shutdown_signal().await;
                    cancel.cancel();
                }
            });
            let result = commands::login(&app, &cancel, &mut stdout, |url| open::that(url)).await;
            signal.abort();
            result
        }
        Command::Logout => commands::logout(&app, &mut stdout).await,
        Command::Playlists => commands::playlists(&app, &mut stdout).await,
        Command::Show { playlist } => commands::show(&app, &playlist, &mut stdout).await,
        Command::Reorder {
            playlist_id,
            criteria,
            title,
        } => {
            commands::reorder(&app, &playlist_id, criteria, title.as_deref(), &mut stdout).await
        }
        Command::Status => Ok(()),
    }
}

/// Resolves on SIGINT or SIGTERM. If a handler cannot be installed that
/// signal is ignored rather than aborting the login.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, cancelling"),
        _ = terminate => info!("received SIGTERM, cancelling"),
    }
}
