use poise::{CreateReply, FrameworkError, serenity_prelude as serenity};
use ::serenity::all::{ComponentInteraction, FullEvent, Interaction};
use tracing::{error, info};

use crate::commands::music::utils::component_handlers;
use crate::{Data, Error};

/// Routes gateway events the framework does not handle itself
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            info!("{} has connected to Discord", data_about_bot.user.name);
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } if component.data.custom_id.starts_with("music_") => {
            music_component_interaction(ctx, component, data).await;
        }
        _ => (),
    }

    Ok(())
}

/// Handle component interactions for components with identities starting with "music_"
async fn music_component_interaction(
    ctx: &serenity::Context,
    component: &ComponentInteraction,
    data: &Data,
) {
    if let Err(e) = component_handlers::handle_interaction(ctx, component, &data.scheduler).await {
        error!("Error handling component interaction: {}", e);
    }
}

pub async fn on_error(error: FrameworkError<'_, Data, Error>) {
    match error {
        FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);

            let reply = CreateReply::default()
                .content("❌ An unexpected error occurred.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
