//! Implements the `TrackResolver` trait with the `yt-dlp` command-line tool.

use crate::commands::music::utils::music_manager::MusicError;
use serenity::async_trait;
use std::process::{Command, Output};
use tracing::{debug, info, warn};

use super::{AudioSource, AudioSourceResult, TrackResolver};
use super::track_metadata::{Requester, TrackMetadata};

/// Resolves tracks by running `yt-dlp` on the blocking thread pool.
pub struct YtDlpResolver {
    program: String,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Turns user input into the argument handed to `yt-dlp`.
    /// URLs are passed through untouched, anything else becomes a single-result search.
    pub fn search_target(query: &str) -> String {
        let query = query.trim();
        if AudioSource::is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{}", query)
        }
    }

    /// Runs `yt-dlp` with the given arguments without blocking the runtime.
    async fn run(&self, args: Vec<String>) -> std::io::Result<Output> {
        let program = self.program.clone();
        debug!("Running {} {:?}", program, args);

        tokio::task::spawn_blocking(move || Command::new(program).args(args).output())
            .await
            .map_err(std::io::Error::other)?
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// First non-empty line of a process' stdout.
fn first_line(output: &Output) -> Option<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve_metadata(
        &self,
        query: &str,
        requested_by: Requester,
    ) -> AudioSourceResult<TrackMetadata> {
        info!("Searching for track: {}", query);
        let target = Self::search_target(query);

        let output = self
            .run(vec![
                "-j".to_string(),            // Output as JSON
                "--no-playlist".to_string(), // Don't process playlists
                target,
            ])
            .await
            .map_err(|e| MusicError::NotFound(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            warn!(
                "yt-dlp search for '{}' exited with {}: {}",
                query,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let line = first_line(&output)
            .ok_or_else(|| MusicError::NotFound(format!("No results for '{}'", query)))?;

        TrackMetadata::from_ytdlp_json(&line, requested_by)
    }

    async fn resolve_stream_url(&self, source_url: &str) -> AudioSourceResult<String> {
        debug!("Resolving stream URL for {}", source_url);

        let output = self
            .run(vec![
                "-f".to_string(),
                "bestaudio/best".to_string(),
                "-g".to_string(), // Print the media URL only
                "--no-playlist".to_string(),
                source_url.to_string(),
            ])
            .await
            .map_err(|e| MusicError::ResolutionFailed(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            return Err(MusicError::ResolutionFailed(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        first_line(&output).ok_or_else(|| {
            MusicError::ResolutionFailed(format!("No stream available for {}", source_url))
        })
    }
}
