//! The per-guild playback engine.
//!
//! Every transition that changes which session a guild holds or which track
//! it streams runs under that guild's async lock, so at most one `advance`
//! cycle is in flight per guild. Queue state itself lives in the
//! [`QueueManager`] behind a short-lived store lock that is never held while
//! waiting on the resolver, the voice connector or the audio session.
//!
//! Stream completions arrive on songbird's threads and come back here as
//! [`PlaybackEvent`]s through [`PlaybackScheduler::spawn_event_loop`].

use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::commands::music::audio_sources::TrackResolver;
use crate::commands::music::audio_sources::track_metadata::{Requester, TrackMetadata};

use super::announcer::Announcer;
use super::event_handlers::{PlaybackEvent, PlaybackEventSender, PlaybackEvents, playback_channel};
use super::music_manager::{MusicError, MusicResult};
use super::queue_manager::{QueueManager, QueueSnapshot};
use super::voice::{AudioSession, TransportState, VoiceConnector};

/// What a `play` request did.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// The request started playback; carries the track now streaming.
    NowPlaying(TrackMetadata),
    /// Playback was already running; the track waits at `position` (1-based).
    Queued { track: TrackMetadata, position: usize },
}

/// How an advance cycle ended.
enum Advance {
    Started(TrackMetadata),
    /// The guild was stopped mid-cycle.
    Stopped,
    /// Nothing playable was left; the session has been torn down.
    Exhausted,
}

#[derive(Clone)]
struct ActiveSession {
    id: u64,
    session: Arc<dyn AudioSession>,
}

pub struct PlaybackScheduler {
    store: Mutex<QueueManager>,
    sessions: DashMap<GuildId, ActiveSession>,
    guild_locks: DashMap<GuildId, Arc<Mutex<()>>>,
    resolver: Arc<dyn TrackResolver>,
    connector: Arc<dyn VoiceConnector>,
    announcer: Arc<dyn Announcer>,
    events: PlaybackEventSender,
    next_session_id: AtomicU64,
    connect_timeout: Duration,
}

impl PlaybackScheduler {
    /// Builds a scheduler and the receiving end of its event channel. The
    /// events must be drained, normally with [`Self::spawn_event_loop`].
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        connector: Arc<dyn VoiceConnector>,
        announcer: Arc<dyn Announcer>,
        connect_timeout: Duration,
    ) -> (Arc<Self>, PlaybackEvents) {
        let (events, receiver) = playback_channel();

        let scheduler = Arc::new(Self {
            store: Mutex::new(QueueManager::new()),
            sessions: DashMap::new(),
            guild_locks: DashMap::new(),
            resolver,
            connector,
            announcer,
            events,
            next_session_id: AtomicU64::new(0),
            connect_timeout,
        });

        (scheduler, receiver)
    }

    /// Drains playback events, handling each on its own task.
    pub fn spawn_event_loop(self: &Arc<Self>, mut events: PlaybackEvents) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);

        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                debug!("Dispatching {:?}", event);
                let scheduler = Arc::clone(&scheduler);
                tokio::spawn(async move { scheduler.handle_event(event).await });
            }
            info!("Playback event loop finished");
        })
    }

    pub async fn handle_event(&self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::TrackEnded {
                guild_id,
                generation,
            } => self.on_track_end(guild_id, generation).await,
            PlaybackEvent::SessionLost {
                guild_id,
                session_id,
            } => self.on_session_lost(guild_id, session_id).await,
        }
    }

    fn guild_lock(&self, guild_id: GuildId) -> Arc<Mutex<()>> {
        self.guild_locks.entry(guild_id).or_default().clone()
    }

    fn session(&self, guild_id: GuildId) -> Option<ActiveSession> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// True while the guild holds a voice session.
    pub fn is_connected(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub async fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        self.store.lock().await.snapshot(guild_id)
    }

    /// Looks `query` up, queues the result and starts playback if the guild
    /// is idle. Joins `voice_channel` first when the guild has no session; a
    /// failed or timed-out join leaves the queue untouched.
    pub async fn play(
        &self,
        guild_id: GuildId,
        voice_channel: Option<ChannelId>,
        query: &str,
        requested_by: Requester,
    ) -> MusicResult<PlayOutcome> {
        let track = self.resolver.resolve_metadata(query, requested_by).await?;
        info!("Resolved '{}' to '{}'", query, track.title);

        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        if self.session(guild_id).is_none() {
            let channel_id = voice_channel.ok_or(MusicError::UserNotInVoiceChannel)?;
            self.connect(guild_id, channel_id).await?;
        }

        let (position, started) = self
            .store
            .lock()
            .await
            .enqueue_and_claim(guild_id, track.clone());

        if !started {
            info!(
                "Queued '{}' at position {} in guild {}",
                track.title, position, guild_id
            );
            return Ok(PlayOutcome::Queued { track, position });
        }

        match self.advance_locked(guild_id).await {
            Advance::Started(now_playing) if now_playing == track => {
                Ok(PlayOutcome::NowPlaying(now_playing))
            }
            // Tracks left queued by a lost session play first
            Advance::Started(_) => {
                let snapshot = self.store.lock().await.snapshot(guild_id);
                match snapshot.tracks.iter().rposition(|queued| *queued == track) {
                    Some(index) => Ok(PlayOutcome::Queued {
                        track,
                        position: index + 1,
                    }),
                    None => Err(MusicError::ResolutionFailed(format!(
                        "No playable stream for '{}'",
                        track.title
                    ))),
                }
            }
            Advance::Stopped => Err(MusicError::Stopped),
            Advance::Exhausted => Err(MusicError::ResolutionFailed(format!(
                "No playable stream for '{}'",
                track.title
            ))),
        }
    }

    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> MusicResult<()> {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed) + 1;
        let on_disconnect = self.events.disconnect(guild_id, session_id);

        let connecting = self.connector.connect(guild_id, channel_id, on_disconnect);
        let session = match tokio::time::timeout(self.connect_timeout, connecting).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                error!("Failed to join voice channel {}: {}", channel_id, e);
                return Err(e);
            }
            Err(_) => {
                warn!(
                    "Joining voice channel {} in guild {} timed out",
                    channel_id, guild_id
                );
                self.connector.abandon(guild_id).await;
                return Err(MusicError::ConnectionTimeout(self.connect_timeout));
            }
        };

        info!("Session {} established for guild {}", session_id, guild_id);
        self.sessions.insert(
            guild_id,
            ActiveSession {
                id: session_id,
                session,
            },
        );
        Ok(())
    }

    /// Plays the next queued track, or idles out and disconnects when none remain.
    /// Does nothing when the guild has no session.
    pub async fn advance(&self, guild_id: GuildId) {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;
        self.advance_locked(guild_id).await;
    }

    /// Tracks whose stream cannot be resolved are dropped and the next one is
    /// tried, at most once per track queued when the cycle began.
    async fn advance_locked(&self, guild_id: GuildId) -> Advance {
        let Some(active) = self.session(guild_id) else {
            debug!("No session for guild {}, nothing to advance", guild_id);
            return Advance::Exhausted;
        };

        let budget = self.store.lock().await.len(guild_id);

        for attempt in 1..=budget {
            let Some(track) = self.store.lock().await.promote_head(guild_id) else {
                break;
            };
            info!("Advancing guild {} to '{}'", guild_id, track.title);

            let stream_url = match self.resolver.resolve_stream_url(&track.url).await {
                Ok(url) => url,
                Err(e) => {
                    warn!(
                        "Skipping '{}' in guild {} (attempt {}/{}): {}",
                        track.title, guild_id, attempt, budget, e
                    );
                    continue;
                }
            };

            let generation = {
                let mut store = self.store.lock().await;
                let (_, still_playing) = store.playback_status(guild_id);
                still_playing.then(|| store.next_generation(guild_id))
            };
            let Some(generation) = generation else {
                info!(
                    "Guild {} was stopped while resolving '{}'",
                    guild_id, track.title
                );
                self.teardown(guild_id, &active).await;
                return Advance::Stopped;
            };

            let on_complete = self.events.completion(guild_id, generation);
            if let Err(e) = active.session.play(&stream_url, on_complete).await {
                warn!("Could not stream '{}' in guild {}: {}", track.title, guild_id, e);
                continue;
            }

            // A stop that ran while the stream was starting found nothing to
            // stop; end the stream so its completion tears the session down.
            let (_, still_playing) = self.store.lock().await.playback_status(guild_id);
            if !still_playing {
                info!(
                    "Guild {} was stopped while starting '{}'",
                    guild_id, track.title
                );
                if let Err(e) = active.session.stop().await {
                    warn!("Could not stop '{}' in guild {}: {}", track.title, guild_id, e);
                    self.teardown(guild_id, &active).await;
                }
                return Advance::Stopped;
            }

            self.announcer.now_playing(guild_id, &track);
            return Advance::Started(track);
        }

        self.teardown(guild_id, &active).await;
        Advance::Exhausted
    }

    /// Returns the guild to idle and releases its voice session.
    async fn teardown(&self, guild_id: GuildId, active: &ActiveSession) {
        {
            let mut store = self.store.lock().await;
            store.reset_session(guild_id);
            let leftover = store.len(guild_id);
            if leftover > 0 {
                warn!(
                    "Idling guild {} with {} unplayable tracks still queued",
                    guild_id, leftover
                );
            }
        }

        self.sessions
            .remove_if(&guild_id, |_, current| current.id == active.id);

        info!("Playback finished in guild {}, disconnecting", guild_id);
        if let Err(e) = active.session.disconnect().await {
            warn!("Disconnect failed for guild {}: {}", guild_id, e);
        }
    }

    async fn on_track_end(&self, guild_id: GuildId, generation: u64) {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let (current, is_playing) = self.store.lock().await.playback_status(guild_id);
        if current != generation {
            debug!(
                "Ignoring completion of generation {} in guild {} (now {})",
                generation, guild_id, current
            );
            return;
        }

        if is_playing {
            self.advance_locked(guild_id).await;
            return;
        }

        // Stopped: the queue was cleared, so go straight to the idle path
        match self.session(guild_id) {
            Some(active) => self.teardown(guild_id, &active).await,
            None => self.store.lock().await.reset_session(guild_id),
        }
    }

    async fn on_session_lost(&self, guild_id: GuildId, session_id: u64) {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        match self.session(guild_id) {
            Some(active) if active.id == session_id => {
                info!("Voice session lost in guild {}", guild_id);
                self.teardown(guild_id, &active).await;
            }
            _ => debug!(
                "Ignoring loss of superseded session {} in guild {}",
                session_id, guild_id
            ),
        }
    }

    pub async fn pause(&self, guild_id: GuildId) -> MusicResult<()> {
        let active = self.session(guild_id).ok_or(MusicError::NotConnected)?;
        match active.session.state().await {
            TransportState::Playing => active.session.pause().await,
            _ => Err(MusicError::NotPlaying),
        }
    }

    pub async fn resume(&self, guild_id: GuildId) -> MusicResult<()> {
        let active = self.session(guild_id).ok_or(MusicError::NotConnected)?;
        match active.session.state().await {
            TransportState::Paused => active.session.resume().await,
            _ => Err(MusicError::NotPaused),
        }
    }

    /// Stops the current stream; its completion notification advances the queue.
    pub async fn skip(&self, guild_id: GuildId) -> MusicResult<()> {
        let active = self.session(guild_id).ok_or(MusicError::NotConnected)?;
        match active.session.state().await {
            TransportState::Playing | TransportState::Paused => {
                info!("Skipping current track in guild {}", guild_id);
                active.session.stop().await
            }
            TransportState::Idle => Err(MusicError::NothingPlaying),
        }
    }

    /// Clears the queue and stops the current stream. The stream's completion
    /// then finds the guild stopped and disconnects instead of advancing.
    pub async fn stop(&self, guild_id: GuildId) -> MusicResult<()> {
        let active = self.session(guild_id).ok_or(MusicError::NotConnected)?;

        self.store.lock().await.clear(guild_id);
        info!("Stopped playback and cleared queue in guild {}", guild_id);

        let transport = active.session.state().await;
        active.session.stop().await?;

        // Nothing was streaming, so no completion is coming. If an advance
        // holds the lock it sees the cleared flag once its resolution returns.
        if transport == TransportState::Idle {
            let lock = self.guild_lock(guild_id);
            if let Ok(_guard) = lock.try_lock() {
                if let Some(active) = self.session(guild_id) {
                    self.teardown(guild_id, &active).await;
                }
            }
        }

        Ok(())
    }
}
