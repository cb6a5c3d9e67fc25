//! Shared types for the playlist-reorder workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
