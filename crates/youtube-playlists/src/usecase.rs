//! Playlist reordering
//!
//! YouTube has no "sort playlist" call, so reordering fetches the playlist,
//! sorts it locally and saves the result as a new playlist. The source
//! playlist is left untouched.

use tracing::{error, info};

use crate::PlaylistProvider;
use crate::domain::SortCriteria;
use crate::error::{Error, Result};

/// Rebuild `playlist_id` ordered by `criteria` as a new playlist. Returns
/// the new playlist's id.
///
/// Without a `title` the copy is named after the source, see
/// [`default_title`].
pub async fn reorder_playlist<P: PlaylistProvider + ?Sized>(
    provider: &P,
    playlist_id: &str,
    criteria: SortCriteria,
    title: Option<&str>,
) -> Result<String> {
    if playlist_id.trim().is_empty() {
        return Err(Error::InvalidInput("playlist id cannot be empty".into()));
    }
    if title.is_some_and(|t| t.trim().is_empty()) {
        return Err(Error::InvalidInput("new playlist title cannot be empty".into()));
    }

    info!(playlist_id, %criteria, "reordering playlist");
    let mut playlist = provider.playlist(playlist_id).await.inspect_err(|e| {
        error!(playlist_id, error = %e, "failed to fetch playlist for reorder");
    })?;

    playlist.sort_by(criteria);
    let title = match title {
        Some(t) => t.to_string(),
        None => default_title(&playlist.title, criteria),
    };

    let new_id = provider
        .save_playlist(&title, &playlist)
        .await
        .inspect_err(|e| error!(playlist_id, error = %e, "failed to save reordered playlist"))?;

    info!(
        source = playlist_id,
        new_playlist_id = %new_id,
        videos = playlist.videos.len(),
        "reordered playlist saved"
    );
    Ok(new_id)
}

/// `"<source title> (by <criteria>)"`
pub fn default_title(source_title: &str, criteria: SortCriteria) -> String {
    format!("{source_title} (by {criteria})")
}
