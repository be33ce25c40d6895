use poise::serenity_prelude::Context;
use ::serenity::all::{
    ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseMessage,
};
use tracing::{error, info};

use super::button_controls::{PAUSE_BUTTON_ID, SKIP_BUTTON_ID, STOP_BUTTON_ID};
use super::embedded_messages::{PAUSED, SKIPPED, STOPPED};
use super::music_manager::{MusicError, MusicResult};
use super::scheduler::PlaybackScheduler;

type ButtonInteractionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Text shown to the user who pressed a button
fn button_feedback(result: MusicResult<&str>) -> String {
    match result {
        Ok(text) => text.to_string(),
        Err(MusicError::NotPlaying | MusicError::NothingPlaying) => {
            "Nothing is playing".to_string()
        }
        Err(MusicError::NotConnected) => "Bot is not in a voice channel".to_string(),
        Err(e) => format!("❌ {}", e),
    }
}

/// Handle a button interaction on a now-playing message
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    scheduler: &PlaybackScheduler,
) -> ButtonInteractionResult {
    let guild_id = interaction.guild_id.ok_or(MusicError::NotInGuild)?;
    info!(
        "Button {} pressed in guild {}",
        interaction.data.custom_id, guild_id
    );

    let result = match interaction.data.custom_id.as_str() {
        PAUSE_BUTTON_ID => scheduler.pause(guild_id).await.map(|_| PAUSED),
        SKIP_BUTTON_ID => scheduler.skip(guild_id).await.map(|_| SKIPPED),
        STOP_BUTTON_ID => scheduler.stop(guild_id).await.map(|_| STOPPED),
        other => {
            error!("Unknown button ID: {}", other);
            return respond(ctx, interaction, "Unknown button action.".to_string()).await;
        }
    };

    respond(ctx, interaction, button_feedback(result)).await
}

async fn respond(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: String,
) -> ButtonInteractionResult {
    interaction
        .create_response(
            ctx,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}
