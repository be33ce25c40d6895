pub mod help;
pub mod ping;

use crate::{CommandResult, Context};
