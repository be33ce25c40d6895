use super::*;
use crate::commands::music::utils::embedded_messages::RESUMED;

/// Resume a paused track
#[poise::command(slash_command, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().scheduler.resume(guild_id).await {
        Ok(()) => ctx.send(embedded_messages::confirmation(RESUMED)).await?,
        Err(err) => ctx.send(embedded_messages::music_error(&err)).await?,
    };

    Ok(())
}
