//! YouTube playlists: domain model, Data API client, reorder use case
//!
//! Defines the `PlaylistProvider` trait that decouples the reorder logic
//! from the YouTube Data API. `YouTubeClient` is the real implementation;
//! every request it makes authenticates through `youtube_auth::AuthService`,
//! so stale access tokens are refreshed transparently.

pub mod client;
pub mod domain;
pub mod duration;
pub mod error;
pub mod reference;
pub mod usecase;

pub use client::{Privacy, YouTubeClient};
pub use domain::{Playlist, SortCriteria, Video};
pub use error::{Error, Result};
pub use reference::{playlist_id_from_url, resolve_playlist_ref};
pub use usecase::reorder_playlist;

use std::future::Future;
use std::pin::Pin;

/// Source and sink of playlists.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn PlaylistProvider>`).
pub trait PlaylistProvider: Send + Sync {
    /// The signed-in user's playlists, without their videos.
    fn my_playlists(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Playlist>>> + Send + '_>>;

    /// A playlist with all of its videos, in playlist order.
    fn playlist<'a>(
        &'a self,
        playlist_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Playlist>> + Send + 'a>>;

    /// Create a new playlist titled `title` holding `playlist`'s videos in
    /// their current order. Returns the new playlist's id.
    fn save_playlist<'a>(
        &'a self,
        title: &'a str,
        playlist: &'a Playlist,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}
