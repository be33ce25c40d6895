use poise::CreateReply;

use super::*;

/// View the current music queue
#[poise::command(slash_command, category = "Music")]
pub async fn queue(ctx: Context<'_>) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    let data = ctx.data();

    let snapshot = data.scheduler.snapshot(guild_id).await;

    ctx.send(
        CreateReply::default()
            .embed(embedded_messages::music_queue(
                &snapshot,
                data.queue_display_limit,
            ))
            .ephemeral(false),
    )
    .await?;

    Ok(())
}
