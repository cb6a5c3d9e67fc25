//! YouTube Data API v3 client
//!
//! Thin REST client over the handful of endpoints playlist reordering needs:
//! `playlists` (list/insert/delete), `playlistItems` (list/insert) and
//! `videos` (list). Each request fetches a valid bearer token from
//! `AuthService` first, so a token that expires mid-run is refreshed.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;
use youtube_auth::AuthService;

use crate::PlaylistProvider;
use crate::domain::{Playlist, Video};
use crate::duration::parse_iso8601;
use crate::error::{Error, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Maximum `maxResults` and ids per `videos.list` call.
const PAGE_SIZE: usize = 50;

/// Visibility of a newly created playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Unlisted => "unlisted",
            Privacy::Private => "private",
        }
    }
}

// Wire types. Only the fields read are declared.

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistResource {
    id: String,
    #[serde(default)]
    snippet: Option<PlaylistSnippet>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    title: String,
}

impl From<PlaylistResource> for Playlist {
    fn from(resource: PlaylistResource) -> Self {
        let snippet = resource.snippet.unwrap_or_default();
        Playlist {
            id: resource.id,
            channel_id: snippet.channel_id,
            title: snippet.title,
            videos: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    #[serde(default)]
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    snippet: VideoSnippet,
    content_details: VideoContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    published_at: String,
    #[serde(default)]
    default_audio_language: Option<String>,
}

#[derive(Deserialize)]
struct VideoContentDetails {
    duration: String,
}

impl TryFrom<VideoResource> for Video {
    type Error = Error;

    fn try_from(resource: VideoResource) -> Result<Self> {
        let published_at = DateTime::parse_from_rfc3339(&resource.snippet.published_at)
            .map_err(|e| {
                Error::Decode(format!(
                    "video {} publishedAt {:?}: {e}",
                    resource.id, resource.snippet.published_at
                ))
            })?
            .with_timezone(&Utc);
        Ok(Video {
            duration: parse_iso8601(&resource.content_details.duration)?,
            published_at,
            title: resource.snippet.title,
            artist: resource.snippet.channel_title,
            language: resource.snippet.default_audio_language.unwrap_or_default(),
            id: resource.id,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPlaylist<'a> {
    snippet: NewPlaylistSnippet<'a>,
    status: NewPlaylistStatus,
}

#[derive(Serialize)]
struct NewPlaylistSnippet<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPlaylistStatus {
    privacy_status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPlaylistItem<'a> {
    snippet: NewPlaylistItemSnippet<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPlaylistItemSnippet<'a> {
    playlist_id: &'a str,
    resource_id: ResourceId<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId<'a> {
    kind: &'static str,
    video_id: &'a str,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

/// YouTube Data API client authenticated through `AuthService`.
pub struct YouTubeClient {
    auth: Arc<AuthService>,
    base_url: String,
    /// Visibility of playlists created by `save_playlist`
    privacy: Privacy,
}

impl YouTubeClient {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self {
            auth,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            privacy: Privacy::default(),
        }
    }

    pub fn with_privacy(mut self, privacy: Privacy) -> Self {
        self.privacy = privacy;
        self
    }

    /// Point the client at another API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::InvalidInput(format!("API base URL {base_url:?}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::InvalidInput(format!(
                "API base URL must be http(s), got {base_url:?}"
            )));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    fn endpoint(&self, resource: &str, query: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}/{resource}", self.base_url), query)
            .map_err(|e| Error::InvalidInput(format!("building {resource} URL: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.endpoint(resource, query)?;
        let client = self.auth.authenticated_client().await?;
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {resource}: {e}")))?;
        decode(resource, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(resource, query)?;
        let client = self.auth.authenticated_client().await?;
        let response = client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("POST {resource}: {e}")))?;
        decode(resource, response).await
    }

    /// Follow `nextPageToken` until the listing is exhausted.
    async fn list_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let max_results = PAGE_SIZE.to_string();
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = query.to_vec();
            params.push(("maxResults", max_results.as_str()));
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: ListResponse<T> = self.get_json(resource, &params).await?;
            items.extend(page.items);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(items)
    }

    /// The signed-in user's playlists, metadata only.
    pub async fn my_playlists(&self) -> Result<Vec<Playlist>> {
        let resources: Vec<PlaylistResource> = self
            .list_all(
                "playlists",
                &[("part", "id,snippet,contentDetails"), ("mine", "true")],
            )
            .await?;

        if resources.is_empty() {
            warn!("no playlists found for this account");
        }
        info!(count = resources.len(), "fetched playlists");
        Ok(resources.into_iter().map(Playlist::from).collect())
    }

    /// Playlist metadata plus every video, in playlist order.
    ///
    /// Entries that are not videos, or whose details are unavailable
    /// (deleted, private, unparseable), are skipped.
    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        if playlist_id.is_empty() {
            return Err(Error::InvalidInput("playlist id cannot be empty".into()));
        }

        let metadata: ListResponse<PlaylistResource> = self
            .get_json("playlists", &[("part", "id,snippet"), ("id", playlist_id)])
            .await?;
        let mut playlist = metadata
            .items
            .into_iter()
            .next()
            .map(Playlist::from)
            .ok_or_else(|| Error::NotFound(format!("playlist {playlist_id}")))?;

        let items: Vec<PlaylistItemResource> = self
            .list_all(
                "playlistItems",
                &[("part", "id,contentDetails"), ("playlistId", playlist_id)],
            )
            .await?;
        let video_ids: Vec<String> = items
            .into_iter()
            .filter_map(|item| item.content_details.and_then(|d| d.video_id))
            .filter(|id| !id.is_empty())
            .collect();

        playlist.videos = self.videos(&video_ids).await?;
        if playlist.videos.is_empty() {
            return Err(Error::EmptyPlaylist(playlist_id.to_string()));
        }

        info!(
            playlist_id,
            videos = playlist.videos.len(),
            skipped = video_ids.len() - playlist.videos.len(),
            "fetched playlist"
        );
        Ok(playlist)
    }

    pub async fn playlist_by_url(&self, playlist_url: &str) -> Result<Playlist> {
        let playlist_id = crate::reference::playlist_id_from_url(playlist_url)?;
        self.playlist(&playlist_id).await
    }

    /// Video details for `ids`, keeping the order of `ids`.
    async fn videos(&self, ids: &[String]) -> Result<Vec<Video>> {
        let mut by_id: HashMap<String, Video> = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(PAGE_SIZE) {
            let joined = chunk.join(",");
            let page: ListResponse<VideoResource> = self
                .get_json(
                    "videos",
                    &[("part", "snippet,contentDetails"), ("id", joined.as_str())],
                )
                .await?;
            for resource in page.items {
                let id = resource.id.clone();
                match Video::try_from(resource) {
                    Ok(video) => {
                        by_id.insert(id, video);
                    }
                    Err(e) => warn!(video_id = %id, error = %e, "skipping video"),
                }
            }
        }

        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    /// Create an empty playlist and return its id.
    pub async fn create_playlist(&self, title: &str, privacy: Privacy) -> Result<String> {
        let body = NewPlaylist {
            snippet: NewPlaylistSnippet {
                title,
                description: "",
            },
            status: NewPlaylistStatus {
                privacy_status: privacy.as_str(),
            },
        };
        let created: Created = self
            .post_json("playlists", &[("part", "snippet,status")], &body)
            .await?;
        info!(playlist_id = %created.id, privacy = privacy.as_str(), "created playlist");
        Ok(created.id)
    }

    /// Append a video to the end of a playlist.
    pub async fn insert_video(&self, playlist_id: &str, video_id: &str) -> Result<()> {
        let body = NewPlaylistItem {
            snippet: NewPlaylistItemSnippet {
                playlist_id,
                resource_id: ResourceId {
                    kind: "youtube#video",
                    video_id,
                },
            },
        };
        let _: serde_json::Value = self
            .post_json("playlistItems", &[("part", "snippet")], &body)
            .await?;
        debug!(playlist_id, video_id, "inserted video");
        Ok(())
    }

    pub async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        let url = self.endpoint("playlists", &[("id", playlist_id)])?;
        let client = self.auth.authenticated_client().await?;
        let response = client
            .delete(url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("DELETE playlists: {e}")))?;
        check_status(response).await?;
        info!(playlist_id, "deleted playlist");
        Ok(())
    }

    /// Create a playlist titled `title` with `playlist`'s videos in their
    /// current order, using the client's privacy setting (public unless
    /// changed with `with_privacy`). Returns the new playlist's id.
    ///
    /// Videos are inserted one at a time; a failure part way leaves the new
    /// playlist partially filled.
    pub async fn save_playlist(&self, title: &str, playlist: &Playlist) -> Result<String> {
        let new_id = self.create_playlist(title, self.privacy).await?;
        for (position, video) in playlist.videos.iter().enumerate() {
            if let Err(e) = self.insert_video(&new_id, &video.id).await {
                warn!(
                    playlist_id = %new_id,
                    position,
                    video_id = %video.id,
                    "insert failed, playlist left partially filled"
                );
                return Err(e);
            }
        }
        info!(
            playlist_id = %new_id,
            videos = playlist.videos.len(),
            "saved playlist"
        );
        Ok(new_id)
    }
}

impl PlaylistProvider for YouTubeClient {
    fn my_playlists(&self) -> Pin<Box<dyn Future<Output = Result<Vec<Playlist>>> + Send + '_>> {
        Box::pin(YouTubeClient::my_playlists(self))
    }

    fn playlist<'a>(
        &'a self,
        playlist_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Playlist>> + Send + 'a>> {
        Box::pin(YouTubeClient::playlist(self, playlist_id))
    }

    fn save_playlist<'a>(
        &'a self,
        title: &'a str,
        playlist: &'a Playlist,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(YouTubeClient::save_playlist(self, title, playlist))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Err(Error::Api {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(resource: &str, response: Response) -> Result<T> {
    check_status(response)
        .await?
        .json::<T>()
        .await
        .map_err(|e| Error::Decode(format!("{resource}: {e}")))
}
