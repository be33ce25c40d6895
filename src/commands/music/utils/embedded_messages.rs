use poise::CreateReply;
use ::serenity::all::{CreateEmbed, CreateEmbedFooter};
use std::time::Duration;

use super::{format_duration, music_manager::MusicError, queue_manager::QueueSnapshot};
use crate::commands::music::audio_sources::track_metadata::TrackMetadata;

const BLURPLE: u32 = 0x5865f2;
const GREEN: u32 = 0x57f287;
const RED: u32 = 0xff0000;

pub const PAUSED: &str = "⏸ Music paused";
pub const RESUMED: &str = "▶ Music resumed";
pub const SKIPPED: &str = "⏭ Skipped to next song";
pub const STOPPED: &str = "⏹ Music stopped and queue cleared";

/// Duration as shown to users, "Unknown" when the source did not report one
fn display_duration(duration: Option<Duration>) -> String {
    duration
        .map(format_duration)
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Create an embed for when a song is now playing
pub fn now_playing(metadata: &TrackMetadata) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("🎵 Now Playing")
        .description(metadata.title.clone())
        .field("Duration", display_duration(metadata.duration), true)
        .field("Requested by", metadata.requested_by.mention(), true)
        .footer(CreateEmbedFooter::new(format!(
            "Requested by {}",
            metadata.requested_by.name
        )))
        .color(BLURPLE);

    if let Some(thumbnail) = &metadata.thumbnail {
        embed = embed.thumbnail(thumbnail.clone());
    }

    embed
}

/// Reply for a `/play` that started playback
pub fn started_playing(metadata: &TrackMetadata) -> CreateReply {
    CreateReply::default().content(format!("▶️ Now playing: **{}**", metadata.title))
}

/// Create an embed for when a song is added to the queue
pub fn added_to_queue(metadata: &TrackMetadata, position: usize) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("✅ Added to Queue")
            .description(metadata.title.clone())
            .field("Position", format!("#{}", position), true)
            .color(GREEN),
    )
}

/// Text body of the queue view, listing at most `limit` upcoming tracks
pub fn queue_description(snapshot: &QueueSnapshot, limit: usize) -> String {
    let mut description = String::new();

    if let Some(current) = &snapshot.now_playing {
        description.push_str(&format!("**Now playing:** {}\n\n", current.title));
    }

    if snapshot.tracks.is_empty() {
        description.push_str("Queue is empty");
        return description;
    }

    for (index, track) in snapshot.tracks.iter().take(limit).enumerate() {
        description.push_str(&format!("{}. {}\n", index + 1, track.title));
    }

    if snapshot.total() > limit {
        description.push_str(&format!(
            "\n... and {} more songs",
            snapshot.total() - limit
        ));
    }

    description
}

/// Create an embed for the music queue
pub fn music_queue(snapshot: &QueueSnapshot, limit: usize) -> CreateEmbed {
    let embed = CreateEmbed::new()
        .title("🎶 Music Queue")
        .description(queue_description(snapshot, limit))
        .color(BLURPLE);

    if snapshot.tracks.is_empty() {
        embed
    } else {
        embed.footer(CreateEmbedFooter::new(format!(
            "Total songs in queue: {}",
            snapshot.total()
        )))
    }
}

/// Create an error reply for a failed music operation
pub fn music_error(err: &MusicError) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(err.to_string())
                .color(RED),
        )
        .ephemeral(true)
}

/// Plain confirmation reply for a control command
pub fn confirmation(text: &str) -> CreateReply {
    CreateReply::default().content(text)
}
