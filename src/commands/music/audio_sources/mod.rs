//! This module defines the interface the playback engine uses to look tracks up
//! and to turn a queued track into something streamable.
//! The production implementation shells out to `yt-dlp` (see [`youtube`]).

/// Submodule defining the `TrackMetadata` struct used across audio sources.
pub mod track_metadata;
/// Submodule implementing the `TrackResolver` trait on top of `yt-dlp`.
pub mod youtube;

use crate::commands::music::utils::music_manager::MusicResult;
use serenity::async_trait;
use track_metadata::{Requester, TrackMetadata};
use url::Url;

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = MusicResult<T>;

/// Looks up tracks and resolves playable streams.
///
/// Both calls may be slow and may fail; implementations must not block the
/// async runtime while they wait.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Finds the best match for a free-text query or URL.
    ///
    /// Fails with `MusicError::NotFound` when nothing matches.
    async fn resolve_metadata(
        &self,
        query: &str,
        requested_by: Requester,
    ) -> AudioSourceResult<TrackMetadata>;

    /// Resolves a direct stream URL for a track's page URL.
    ///
    /// Fails with `MusicError::ResolutionFailed` when no stream is available.
    async fn resolve_stream_url(&self, source_url: &str) -> AudioSourceResult<String>;
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as a URL.
    /// Does not validate if the URL is actually reachable or supported.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}
