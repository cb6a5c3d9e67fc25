//! Service-specific error types

use thiserror::Error;

/// Errors raised by the command-line front end itself.
///
/// Library failures (auth, API) travel as `anyhow::Error` with context;
/// argument errors are reported by clap before any of this runs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("not logged in or the saved login has expired; run `playlist-reorder login` first")]
    LoginRequired,
}
