//! Melody, a Discord music bot built around a per-guild playback queue.

use std::sync::{Arc, LazyLock};

pub mod commands;
pub mod config;
pub mod events;

use commands::music::utils::{announcer::DiscordAnnouncer, scheduler::PlaybackScheduler};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

/// HTTP client shared by every audio stream
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(reqwest::Client::new);

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub scheduler: Arc<PlaybackScheduler>,
    pub announcer: Arc<DiscordAnnouncer>,
    pub queue_display_limit: usize,
}
