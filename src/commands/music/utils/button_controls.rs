use serenity::all::{ButtonStyle, CreateActionRow, CreateButton};

pub const PAUSE_BUTTON_ID: &str = "music_pause";
pub const SKIP_BUTTON_ID: &str = "music_skip";
pub const STOP_BUTTON_ID: &str = "music_stop";

/// Creates the row of playback buttons attached to now-playing messages
pub fn create_music_control_buttons() -> Vec<CreateActionRow> {
    let pause = CreateButton::new(PAUSE_BUTTON_ID)
        .style(ButtonStyle::Primary)
        .label("⏸ Pause");

    let skip = CreateButton::new(SKIP_BUTTON_ID)
        .style(ButtonStyle::Primary)
        .label("⏭ Skip");

    let stop = CreateButton::new(STOP_BUTTON_ID)
        .style(ButtonStyle::Danger)
        .label("⏹ Stop");

    vec![CreateActionRow::Buttons(vec![pause, skip, stop])]
}
