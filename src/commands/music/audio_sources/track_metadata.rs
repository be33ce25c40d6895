//! Defines `TrackMetadata`, the immutable description of a queued track, and the
//! conversion from `yt-dlp --dump-json` output.

use crate::commands::music::utils::music_manager::{MusicError, MusicResult};
use serde::Deserialize;
use serenity::model::id::UserId;
use std::time::Duration;

/// The user who asked for a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub name: String,
}

impl Requester {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Discord mention markup for the requester.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Unified representation of metadata for a playable track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    /// The title of the track.
    pub title: String,
    /// Page URL of the track, used to re-resolve a stream when it is dequeued.
    pub url: String,
    /// The duration of the track, `None` when the source did not report one.
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
    /// The user who requested the track.
    pub requested_by: Requester,
}

/// The subset of a `yt-dlp -j` document we care about.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

impl TrackMetadata {
    /// Parses one line of `yt-dlp -j` output into track metadata.
    ///
    /// A zero, missing or out-of-range duration is reported as unknown. A document without a
    /// `webpage_url` cannot be re-resolved later and is rejected.
    pub fn from_ytdlp_json(json: &str, requested_by: Requester) -> MusicResult<Self> {
        let info: YtDlpInfo = serde_json::from_str(json)
            .map_err(|e| MusicError::NotFound(format!("Failed to parse video metadata: {}", e)))?;

        let url = info
            .webpage_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| MusicError::NotFound("Result has no page URL".to_string()))?;

        let duration = info
            .duration
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Ok(Self {
            title: info.title.unwrap_or_else(|| "Unknown".to_string()),
            url,
            duration,
            thumbnail: info.thumbnail.filter(|t| !t.is_empty()),
            requested_by,
        })
    }
}
