//! Playlist and video model, and the orderings a playlist can be rebuilt in

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    /// Uploading channel's title
    pub artist: String,
    pub published_at: DateTime<Utc>,
    pub duration: Duration,
    /// `defaultAudioLanguage`; empty when the uploader did not set one
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    /// Empty when only the playlist metadata was fetched
    pub videos: Vec<Video>,
}

impl Playlist {
    /// Reorder the videos ascending by `criteria`.
    ///
    /// Stable: videos that compare equal keep their relative order.
    pub fn sort_by(&mut self, criteria: SortCriteria) {
        match criteria {
            SortCriteria::Name => self.videos.sort_by(|a, b| a.title.cmp(&b.title)),
            SortCriteria::Duration => self.videos.sort_by_key(|v| v.duration),
            SortCriteria::Publish => self.videos.sort_by_key(|v| v.published_at),
            SortCriteria::Language => self.videos.sort_by(|a, b| a.language.cmp(&b.language)),
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.videos.iter().map(|v| v.duration).sum()
    }
}

/// Ordering applied when rebuilding a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortCriteria {
    /// Title, lexicographic
    Name,
    /// Shortest first
    Duration,
    /// Oldest first
    Publish,
    /// Audio language code, lexicographic
    Language,
}

impl SortCriteria {
    pub const ALL: [SortCriteria; 4] = [
        SortCriteria::Name,
        SortCriteria::Duration,
        SortCriteria::Publish,
        SortCriteria::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortCriteria::Name => "name",
            SortCriteria::Duration => "duration",
            SortCriteria::Publish => "publish",
            SortCriteria::Language => "language",
        }
    }
}

impl fmt::Display for SortCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortCriteria {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortCriteria::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidCriteria(s.to_string()))
    }
}
