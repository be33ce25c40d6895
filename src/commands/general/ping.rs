use poise::{CreateReply, serenity_prelude as serenity};
use ::serenity::all::CreateEmbed;
use std::time::Duration;

use super::*;

/// Check the bot's gateway latency
#[poise::command(slash_command, category = "General")]
pub async fn ping(ctx: Context<'_>) -> CommandResult {
    let latency = match shard_latency(&ctx).await {
        Some(latency) => format!("{} ms", latency.as_millis()),
        None => "measuring...".to_string(),
    };

    let reply = CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("Pong!")
                .field("Gateway latency", latency, false),
        )
        .ephemeral(true);

    ctx.send(reply).await?;

    Ok(())
}

async fn shard_latency(ctx: &Context<'_>) -> Option<Duration> {
    let shard_manager = ctx.framework().shard_manager();
    let runners = shard_manager.runners.lock().await;

    // A fresh shard has not completed a heartbeat yet
    let runner = runners.get(&serenity::ShardId(ctx.serenity_context().shard_id.0))?;

    runner.latency
}
