use super::*;
use crate::commands::music::utils::embedded_messages::SKIPPED;
use tracing::info;

/// Skip to the next song in the queue
#[poise::command(slash_command, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;

    match ctx.data().scheduler.skip(guild_id).await {
        Ok(()) => {
            info!("{} skipped the current track in guild {}", ctx.author().name, guild_id);
            ctx.send(embedded_messages::confirmation(SKIPPED)).await?
        }
        Err(err) => ctx.send(embedded_messages::music_error(&err)).await?,
    };

    Ok(())
}
