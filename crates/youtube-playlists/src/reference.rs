//! Playlist references: share URLs and bare ids

use url::Url;

use crate::error::{Error, Result};

/// Extract the playlist id from a YouTube URL's `list` parameter.
///
/// Works for both `/playlist?list=...` and `/watch?v=...&list=...` links.
pub fn playlist_id_from_url(input: &str) -> Result<String> {
    let url = Url::parse(input.trim()).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))?;
    url.query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidUrl(format!("{input}: no `list` parameter")))
}

/// Accept either a playlist URL or a bare playlist id.
pub fn resolve_playlist_ref(input: &str) -> Result<String> {
    let input = input.trim();
    if input.contains("://") {
        return playlist_id_from_url(input);
    }
    if !input.is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Ok(input.to_string());
    }
    Err(Error::InvalidUrl(format!(
        "{input:?} is neither a playlist URL nor a playlist id"
    )))
}
