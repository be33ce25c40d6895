use crate::commands::music::audio_sources::track_metadata::TrackMetadata;
use serenity::model::id::GuildId;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Queue state for a single guild.
#[derive(Debug, Default)]
pub struct GuildQueueState {
    /// Tracks waiting to be played, in playback order.
    pub queue: VecDeque<TrackMetadata>,
    /// The track currently streaming, if any.
    pub now_playing: Option<TrackMetadata>,
    /// True from the first `advance` of a cycle until the session tears down.
    /// Independent of the transport's own paused/resumed state.
    pub is_playing: bool,
    /// Bumped every time a stream is handed to the audio session, so that a
    /// completion notification can be matched to the stream it belongs to.
    pub generation: u64,
}

/// A read-only copy of a guild's queue taken at a single instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueSnapshot {
    pub tracks: Vec<TrackMetadata>,
    pub now_playing: Option<TrackMetadata>,
    pub is_playing: bool,
}

impl QueueSnapshot {
    /// Total number of tracks waiting in the queue.
    pub fn total(&self) -> usize {
        self.tracks.len()
    }
}

/// Owns the queue state of every guild and is the only place it is mutated.
///
/// Entries are created lazily and kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct QueueManager {
    guilds: HashMap<GuildId, GuildQueueState>,
}

impl QueueManager {
    /// Create a new queue manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for a guild, creating an empty one on first use.
    pub fn get_or_create(&mut self, guild_id: GuildId) -> &mut GuildQueueState {
        self.guilds.entry(guild_id).or_default()
    }

    /// Appends a track and returns its 1-based position in the queue.
    pub fn enqueue(&mut self, guild_id: GuildId, track: TrackMetadata) -> usize {
        let state = self.get_or_create(guild_id);
        debug!("Queueing '{}' for guild {}", track.title, guild_id);
        state.queue.push_back(track);
        state.queue.len()
    }

    /// Appends a track and claims the playback cycle if the guild is idle.
    ///
    /// Returns the track's 1-based queue position and whether this call moved
    /// the guild from idle to playing.
    pub fn enqueue_and_claim(&mut self, guild_id: GuildId, track: TrackMetadata) -> (usize, bool) {
        let position = self.enqueue(guild_id, track);
        let state = self.get_or_create(guild_id);
        let started = !state.is_playing;
        state.is_playing = true;
        (position, started)
    }

    /// Removes and returns the first queued track.
    pub fn dequeue_head(&mut self, guild_id: GuildId) -> Option<TrackMetadata> {
        self.get_or_create(guild_id).queue.pop_front()
    }

    /// Moves the head of the queue into `now_playing` in one step and marks
    /// the guild as playing. Clears `now_playing` and returns `None` when the
    /// queue is empty.
    pub fn promote_head(&mut self, guild_id: GuildId) -> Option<TrackMetadata> {
        let next = self.dequeue_head(guild_id);
        let state = self.get_or_create(guild_id);
        state.now_playing = next.clone();
        if next.is_some() {
            state.is_playing = true;
        }
        next
    }

    /// Current stream generation and cycle flag, read together.
    pub fn playback_status(&mut self, guild_id: GuildId) -> (u64, bool) {
        let state = self.get_or_create(guild_id);
        (state.generation, state.is_playing)
    }

    /// Starts a new stream generation and returns it.
    pub fn next_generation(&mut self, guild_id: GuildId) -> u64 {
        let state = self.get_or_create(guild_id);
        state.generation += 1;
        state.generation
    }

    pub fn snapshot(&self, guild_id: GuildId) -> QueueSnapshot {
        match self.guilds.get(&guild_id) {
            Some(state) => QueueSnapshot {
                tracks: state.queue.iter().cloned().collect(),
                now_playing: state.now_playing.clone(),
                is_playing: state.is_playing,
            },
            None => QueueSnapshot::default(),
        }
    }

    /// Empties the queue and marks the guild as no longer playing.
    pub fn clear(&mut self, guild_id: GuildId) {
        let state = self.get_or_create(guild_id);
        state.queue.clear();
        state.is_playing = false;
    }

    /// Drops the session-bound part of a guild's state.
    pub fn reset_session(&mut self, guild_id: GuildId) {
        let state = self.get_or_create(guild_id);
        state.now_playing = None;
        state.is_playing = false;
    }

    pub fn len(&self, guild_id: GuildId) -> usize {
        self.guilds.get(&guild_id).map_or(0, |state| state.queue.len())
    }
}
