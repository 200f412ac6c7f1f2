//! Caller-owned track metadata.

use serde::{Deserialize, Serialize};

/// A track as supplied by the caller (e.g. a bot command handler).
///
/// The render pipeline only reads it. `id` doubles as the cache key and the output filename
/// stem, so it must be filesystem-safe; see [`crate::ThumbnailCache::path_for`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "artist")]
    pub channel_name: Option<String>,
    pub thumbnail: String,
    #[serde(default)]
    pub duration: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, thumbnail: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thumbnail: thumbnail.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_channel_name(mut self, channel_name: impl Into<String>) -> Self {
        self.channel_name = Some(channel_name.into());
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }
}
