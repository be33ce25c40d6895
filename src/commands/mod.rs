//! This module aggregates all the command modules for the bot.

/// General purpose commands (help, ping).
pub mod general;

/// Music playback commands and the per-guild playback engine.
pub mod music;
