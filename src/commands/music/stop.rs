use super::*;
use crate::commands::music::utils::embedded_messages::STOPPED;

/// Stop playback, clear the queue and leave the voice channel
#[poise::command(slash_command, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().scheduler.stop(guild_id).await {
        Ok(()) => ctx.send(embedded_messages::confirmation(STOPPED)).await?,
        Err(err) => ctx.send(embedded_messages::music_error(&err)).await?,
    };

    Ok(())
}
