use poise::serenity_prelude as serenity;
use ::serenity::client::Context;
use ::serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during music operations
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("User is not in a voice channel")]
    UserNotInVoiceChannel,

    #[error("Not connected to a voice channel")]
    NotConnected,

    #[error("Failed to get voice manager")]
    NoVoiceManager,

    #[error("Could not find that song: {0}")]
    NotFound(String),

    #[error("Could not resolve a stream: {0}")]
    ResolutionFailed(String),

    #[error("Could not connect to voice channel: {0}")]
    ConnectionFailed(String),

    #[error("Connection to voice channel timed out after {}s", .0.as_secs())]
    ConnectionTimeout(Duration),

    #[error("Nothing is currently playing")]
    NotPlaying,

    #[error("Music is not paused")]
    NotPaused,

    #[error("Nothing is playing")]
    NothingPlaying,

    #[error("Playback was stopped before the track started")]
    Stopped,

    #[error("Audio transport error: {0}")]
    TransportError(String),
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// Discord-side lookups the commands need before they reach the scheduler.
pub struct MusicManager;

impl MusicManager {
    /// Get the Songbird voice client from the context
    pub async fn get_songbird(ctx: &Context) -> MusicResult<Arc<Songbird>> {
        songbird::get(ctx).await.ok_or(MusicError::NoVoiceManager)
    }

    /// Get the voice channel ID that the user is currently in
    pub fn get_user_voice_channel(
        ctx: &Context,
        guild_id: GuildId,
        user_id: serenity::UserId,
    ) -> MusicResult<ChannelId> {
        // Get the guild
        let guild = ctx.cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

        // Get the voice state of the user
        let voice_state = guild
            .voice_states
            .get(&user_id)
            .ok_or(MusicError::UserNotInVoiceChannel)?;

        voice_state
            .channel_id
            .ok_or(MusicError::UserNotInVoiceChannel)
    }
}
