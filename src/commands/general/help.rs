use super::*;

/// Show the available commands
#[poise::command(slash_command, category = "General")]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            extra_text_at_bottom: "Join a voice channel and use /play to start the music.",
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}
