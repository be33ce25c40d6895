pub mod pause;
pub mod play;
pub mod queue;
pub mod resume;
pub mod skip;
pub mod stop;

pub mod audio_sources;
pub mod utils;

use crate::{CommandResult, Context};
use utils::embedded_messages;
use utils::music_manager::MusicError;
