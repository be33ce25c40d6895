//! The audio transport as the scheduler sees it, and its songbird implementation.

use ::serenity::async_trait;
use ::serenity::model::id::{ChannelId, GuildId};
use ::serenity::prelude::Mutex as SerenityMutex;
use songbird::input::{HttpRequest, Input};
use songbird::tracks::{PlayMode, TrackHandle};
use songbird::{Call, CoreEvent, Event, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::event_handlers::{
    CompletionNotifier, DisconnectNotifier, DriverDisconnectNotifier, SongEndNotifier,
};
use super::music_manager::{MusicError, MusicResult};

/// Transport-level playback state, tracked separately from the queue's `is_playing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// An active voice connection for one guild that streams one item at a time.
#[async_trait]
pub trait AudioSession: Send + Sync {
    /// Starts streaming `stream_url`. `on_complete` must be notified once the
    /// stream stops for any reason.
    async fn play(&self, stream_url: &str, on_complete: CompletionNotifier) -> MusicResult<()>;

    async fn state(&self) -> TransportState;

    async fn pause(&self) -> MusicResult<()>;

    async fn resume(&self) -> MusicResult<()>;

    /// Stops the current stream, which fires its completion notification.
    async fn stop(&self) -> MusicResult<()>;

    /// Leaves the voice channel.
    async fn disconnect(&self) -> MusicResult<()>;
}

/// Establishes voice connections.
#[async_trait]
pub trait VoiceConnector: Send + Sync {
    /// Joins `channel_id`. `on_disconnect` must be notified if the connection
    /// later drops. Callers bound the wait with their own timeout.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        on_disconnect: DisconnectNotifier,
    ) -> MusicResult<Arc<dyn AudioSession>>;

    /// Cleans up after a join that was given up on.
    async fn abandon(&self, guild_id: GuildId);
}

/// Joins voice channels through songbird.
pub struct SongbirdConnector {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdConnector {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

#[async_trait]
impl VoiceConnector for SongbirdConnector {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        on_disconnect: DisconnectNotifier,
    ) -> MusicResult<Arc<dyn AudioSession>> {
        info!("Joining voice channel {} in guild {}", channel_id, guild_id);

        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| MusicError::ConnectionFailed(e.to_string()))?;

        {
            let mut handler = call.lock().await;
            handler.remove_all_global_events();
            handler.add_global_event(
                Event::Core(CoreEvent::DriverDisconnect),
                DriverDisconnectNotifier {
                    notifier: on_disconnect,
                },
            );
        }

        Ok(Arc::new(SongbirdSession {
            guild_id,
            manager: Arc::clone(&self.manager),
            call,
            http: self.http.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn abandon(&self, guild_id: GuildId) {
        if let Err(e) = self.manager.remove(guild_id).await {
            debug!("Nothing to clean up after abandoned join in guild {}: {}", guild_id, e);
        }
    }
}

/// A songbird `Call` plus the handle of the stream it is playing.
pub struct SongbirdSession {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<SerenityMutex<Call>>,
    http: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdSession {
    async fn current_track(&self) -> Option<TrackHandle> {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl AudioSession for SongbirdSession {
    async fn play(&self, stream_url: &str, on_complete: CompletionNotifier) -> MusicResult<()> {
        let input: Input = HttpRequest::new(self.http.clone(), stream_url.to_string()).into();

        let track = {
            let mut handler = self.call.lock().await;
            handler.play_only_input(input)
        };

        for event in [TrackEvent::End, TrackEvent::Error] {
            track
                .add_event(
                    Event::Track(event),
                    SongEndNotifier {
                        notifier: on_complete.clone(),
                    },
                )
                .map_err(|e| MusicError::TransportError(e.to_string()))?;
        }

        debug!(
            "Streaming generation {} in guild {}",
            on_complete.generation(),
            self.guild_id
        );
        *self.current.lock().await = Some(track);
        Ok(())
    }

    async fn state(&self) -> TransportState {
        let Some(track) = self.current_track().await else {
            return TransportState::Idle;
        };

        match track.get_info().await {
            Ok(info) => match info.playing {
                PlayMode::Play => TransportState::Playing,
                PlayMode::Pause => TransportState::Paused,
                _ => TransportState::Idle,
            },
            // The track has already finished and its handle is dead
            Err(_) => TransportState::Idle,
        }
    }

    async fn pause(&self) -> MusicResult<()> {
        let track = self.current_track().await.ok_or(MusicError::NotPlaying)?;
        track
            .pause()
            .map_err(|e| MusicError::TransportError(e.to_string()))
    }

    async fn resume(&self) -> MusicResult<()> {
        let track = self.current_track().await.ok_or(MusicError::NotPaused)?;
        track
            .play()
            .map_err(|e| MusicError::TransportError(e.to_string()))
    }

    async fn stop(&self) -> MusicResult<()> {
        let Some(track) = self.current_track().await else {
            return Ok(());
        };

        // A track that already ended is as stopped as it gets
        match track.stop() {
            Ok(_) | Err(songbird::error::ControlError::Finished) => Ok(()),
            Err(e) => Err(MusicError::TransportError(e.to_string())),
        }
    }

    async fn disconnect(&self) -> MusicResult<()> {
        info!("Leaving voice channel in guild {}", self.guild_id);
        self.current.lock().await.take();

        if let Err(e) = self.manager.remove(self.guild_id).await {
            warn!("Failed to leave voice channel in guild {}: {}", self.guild_id, e);
            return Err(MusicError::TransportError(e.to_string()));
        }

        Ok(())
    }
}
