//! Posts "now playing" messages when the scheduler starts a track.

use dashmap::DashMap;
use ::serenity::all::{Cache, ChannelType, CreateMessage, Http};
use ::serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::commands::music::audio_sources::track_metadata::TrackMetadata;

use super::{button_controls, embedded_messages};

/// Receives presentation events from the scheduler.
///
/// Implementations must return immediately; delivery is best-effort and a
/// failure never affects playback.
pub trait Announcer: Send + Sync {
    fn now_playing(&self, guild_id: GuildId, track: &TrackMetadata);
}

/// Sends the now-playing embed with playback buttons to a guild text channel.
pub struct DiscordAnnouncer {
    http: Arc<Http>,
    cache: Arc<Cache>,
    // Channel each guild last used `/play` from
    channel_ids: DashMap<GuildId, ChannelId>,
}

impl DiscordAnnouncer {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self {
            http,
            cache,
            channel_ids: DashMap::new(),
        }
    }

    /// Prefer `channel_id` for this guild's announcements.
    pub fn bind_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.channel_ids.insert(guild_id, channel_id);
    }

    /// The bound channel, or else the first text channel the bot may post in.
    fn output_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        if let Some(channel_id) = self.channel_ids.get(&guild_id) {
            return Some(*channel_id);
        }

        let bot_id = self.cache.current_user().id;
        let guild = self.cache.guild(guild_id)?;
        let me = guild.members.get(&bot_id)?;

        let mut channels: Vec<_> = guild
            .channels
            .values()
            .filter(|channel| channel.kind == ChannelType::Text)
            .collect();
        channels.sort_by_key(|channel| channel.position);

        channels
            .into_iter()
            .find(|channel| guild.user_permissions_in(channel, me).send_messages())
            .map(|channel| channel.id)
    }
}

impl Announcer for DiscordAnnouncer {
    fn now_playing(&self, guild_id: GuildId, track: &TrackMetadata) {
        let Some(channel_id) = self.output_channel(guild_id) else {
            debug!("No channel to announce '{}' in guild {}", track.title, guild_id);
            return;
        };

        let message = CreateMessage::new()
            .embed(embedded_messages::now_playing(track))
            .components(button_controls::create_music_control_buttons());
        let http = Arc::clone(&self.http);
        let title = track.title.clone();

        tokio::spawn(async move {
            match channel_id.send_message(http, message).await {
                Ok(_) => info!("Announced '{}' in channel {}", title, channel_id),
                Err(e) => warn!("Failed to announce '{}' in channel {}: {}", title, channel_id, e),
            }
        });
    }
}
