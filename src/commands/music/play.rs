use tracing::{error, info};

use super::*;
use crate::commands::music::{
    audio_sources::track_metadata::Requester,
    utils::{music_manager::MusicManager, scheduler::PlayOutcome},
};

/// Play a song from a URL or search query
#[poise::command(slash_command, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received /play command with query: {}", query);

    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    let channel_id = match MusicManager::get_user_voice_channel(
        ctx.serenity_context(),
        guild_id,
        ctx.author().id,
    ) {
        Ok(channel_id) => channel_id,
        Err(err) => {
            ctx.send(embedded_messages::music_error(&err)).await?;
            return Ok(());
        }
    };

    // Resolution can take several seconds
    ctx.defer().await?;

    let data = ctx.data();
    data.announcer.bind_channel(guild_id, ctx.channel_id());

    let requester = Requester::new(ctx.author().id, ctx.author().name.clone());

    match data
        .scheduler
        .play(guild_id, Some(channel_id), &query, requester)
        .await
    {
        Ok(PlayOutcome::NowPlaying(track)) => {
            ctx.send(embedded_messages::started_playing(&track)).await?
        }
        Ok(PlayOutcome::Queued { track, position }) => {
            ctx.send(embedded_messages::added_to_queue(&track, position))
                .await?
        }
        Err(err) => {
            error!("Failed to play '{}' in guild {}: {}", query, guild_id, err);
            ctx.send(embedded_messages::music_error(&err)).await?
        }
    };

    Ok(())
}
