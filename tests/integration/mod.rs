//! Integration tests driving the playback scheduler end to end

pub mod scheduler;
