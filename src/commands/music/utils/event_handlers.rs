//! Notifications that cross from songbird's driver threads back into the
//! playback scheduler.
//!
//! Songbird invokes event handlers on its own tasks. None of them touch queue
//! state; they post a [`PlaybackEvent`] onto an unbounded channel, which never
//! blocks the sender, and the scheduler drains that channel.

use ::serenity::async_trait;
use ::serenity::model::id::GuildId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, warn};

/// Something happened on an audio session that the scheduler must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The stream started for `generation` stopped, whatever the cause.
    TrackEnded { guild_id: GuildId, generation: u64 },
    /// The voice connection identified by `session_id` went away.
    SessionLost { guild_id: GuildId, session_id: u64 },
}

impl PlaybackEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            Self::TrackEnded { guild_id, .. } | Self::SessionLost { guild_id, .. } => *guild_id,
        }
    }
}

/// Sending half of the scheduler's event channel.
#[derive(Clone)]
pub struct PlaybackEventSender {
    tx: UnboundedSender<PlaybackEvent>,
}

/// Receiving half of the scheduler's event channel.
pub struct PlaybackEvents {
    rx: UnboundedReceiver<PlaybackEvent>,
}

/// Creates a connected sender/receiver pair.
pub fn playback_channel() -> (PlaybackEventSender, PlaybackEvents) {
    let (tx, rx) = unbounded_channel();
    (PlaybackEventSender { tx }, PlaybackEvents { rx })
}

impl PlaybackEventSender {
    fn post(&self, event: PlaybackEvent) {
        if self.tx.send(event).is_err() {
            warn!("Playback event loop is gone, dropping {:?}", event);
        }
    }

    /// A one-shot notifier for the stream about to start.
    pub fn completion(&self, guild_id: GuildId, generation: u64) -> CompletionNotifier {
        CompletionNotifier {
            sender: self.clone(),
            guild_id,
            generation,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A notifier for the loss of a voice connection.
    pub fn disconnect(&self, guild_id: GuildId, session_id: u64) -> DisconnectNotifier {
        DisconnectNotifier {
            sender: self.clone(),
            guild_id,
            session_id,
        }
    }
}

impl PlaybackEvents {
    /// Waits for the next event; `None` once every sender is dropped.
    pub async fn next(&mut self) -> Option<PlaybackEvent> {
        self.rx.recv().await
    }

    /// Returns an already-queued event without waiting.
    pub fn try_next(&mut self) -> Option<PlaybackEvent> {
        self.rx.try_recv().ok()
    }
}

/// Signals the end of one stream. Clones share state, so however many
/// handlers hold a copy, only the first `notify` is delivered.
#[derive(Clone)]
pub struct CompletionNotifier {
    sender: PlaybackEventSender,
    guild_id: GuildId,
    generation: u64,
    fired: Arc<AtomicBool>,
}

impl CompletionNotifier {
    pub fn notify(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            debug!(
                "Completion for guild {} generation {} already delivered",
                self.guild_id, self.generation
            );
            return;
        }

        self.sender.post(PlaybackEvent::TrackEnded {
            guild_id: self.guild_id,
            generation: self.generation,
        });
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Signals that a voice connection dropped.
#[derive(Clone)]
pub struct DisconnectNotifier {
    sender: PlaybackEventSender,
    guild_id: GuildId,
    session_id: u64,
}

impl DisconnectNotifier {
    pub fn notify(&self) {
        self.sender.post(PlaybackEvent::SessionLost {
            guild_id: self.guild_id,
            session_id: self.session_id,
        });
    }
}

/// Event handler for when a song ends or errors
pub struct SongEndNotifier {
    pub notifier: CompletionNotifier,
}

#[async_trait]
impl songbird::EventHandler for SongEndNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                debug!("Track stopped in state {:?}", state.playing);
            }
            self.notifier.notify();
        }
        None
    }
}

/// Event handler for when the voice driver loses its connection
pub struct DriverDisconnectNotifier {
    pub notifier: DisconnectNotifier,
}

#[async_trait]
impl songbird::EventHandler for DriverDisconnectNotifier {
    async fn act(&self, ctx: &songbird::EventContext<'_>) -> Option<songbird::Event> {
        if let songbird::EventContext::DriverDisconnect(data) = ctx {
            debug!(
                "Voice driver disconnected (kind {:?}, reason {:?})",
                data.kind, data.reason
            );
            self.notifier.notify();
        }
        None
    }
}
