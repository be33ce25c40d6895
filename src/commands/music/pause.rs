use super::*;
use crate::commands::music::utils::embedded_messages::PAUSED;

/// Pause the current track
#[poise::command(slash_command, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().scheduler.pause(guild_id).await {
        Ok(()) => ctx.send(embedded_messages::confirmation(PAUSED)).await?,
        Err(err) => ctx.send(embedded_messages::music_error(&err)).await?,
    };

    Ok(())
}
