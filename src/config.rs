use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const TOKEN_PLACEHOLDER: &str = "your_discord_bot_token_here";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("DISCORD_TOKEN is not set")]
    MissingToken,

    #[error("DISCORD_TOKEN is empty or still the placeholder value")]
    InvalidToken,

    #[error("{name} has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Runtime settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    /// Upper bound for joining a voice channel
    pub connect_timeout: Duration,
    pub ytdlp_path: String,
    /// Entries listed by `/queue`
    pub queue_display_limit: usize,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_token = lookup("DISCORD_TOKEN").ok_or(ConfigError::MissingToken)?;

        let connect_timeout_secs: u64 = parse_or("MELODY_CONNECT_TIMEOUT_SECS", &lookup, 10)?;
        let queue_display_limit = parse_or("MELODY_QUEUE_DISPLAY_LIMIT", &lookup, 10)?;

        Ok(Self {
            discord_token: sanitize_token(&raw_token)?,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            ytdlp_path: lookup("MELODY_YTDLP_PATH")
                .filter(|path| !path.trim().is_empty())
                .unwrap_or_else(|| "yt-dlp".to_string()),
            queue_display_limit,
        })
    }
}

fn parse_or<T, F>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value })
        }
        _ => Ok(default),
    }
}

/// Strips quotes and a `Bot ` prefix that often sneak into `.env` files.
pub fn sanitize_token(raw: &str) -> Result<String, ConfigError> {
    let token = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let token = token.strip_prefix("Bot ").unwrap_or(token).trim();

    if token.is_empty() || token == TOKEN_PLACEHOLDER {
        return Err(ConfigError::InvalidToken);
    }

    Ok(token.to_string())
}
