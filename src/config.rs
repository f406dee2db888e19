use std::env;
use std::time::Duration;

use crate::platform::ChannelId;
use crate::room::RoomSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub discord_token: String,
    pub discord_guild_id: u64,
    pub discord_api_base: String,
    pub room_category_id: Option<u64>,
    pub room_creation_channel_id: Option<u64>,
    pub general_voice_channel_id: Option<u64>,
    pub room_prefix: String,
    pub max_users_in_room: u32,
    pub bot_server_url: String,
    pub platform_timeout_ms: u64,
    pub room_idle_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            discord_token: env::var("DISCORD_TOKEN").map_err(|_| ConfigError::MissingToken)?,
            discord_guild_id: env::var("DISCORD_GUILD_ID")
                .map_err(|_| ConfigError::MissingGuild)?
                .parse()
                .map_err(|_| ConfigError::InvalidId("DISCORD_GUILD_ID"))?,
            discord_api_base: env::var("DISCORD_API_BASE")
                .unwrap_or_else(|_| "https://discord.com/api/v10".to_string()),
            room_category_id: optional_id("ROOM_CATEGORY_ID")?,
            room_creation_channel_id: optional_id("ROOM_CREATION_CHANNEL_ID")?,
            general_voice_channel_id: optional_id("GENERAL_VOICE_CHANNEL_ID")?,
            room_prefix: env::var("ROOM_PREFIX").unwrap_or_else(|_| "Room ".to_string()),
            max_users_in_room: env::var("MAX_USERS_IN_ROOM")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            bot_server_url: env::var("BOT_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            platform_timeout_ms: env::var("PLATFORM_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            room_idle_timeout_seconds: env::var("ROOM_IDLE_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "7200".to_string())
                .parse()
                .unwrap_or(7200),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Snapshot handed to every room created under this configuration
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            room_prefix: self.room_prefix.clone(),
            max_users_in_room: self.max_users_in_room,
            bot_server_url: self.bot_server_url.clone(),
            room_creation_voice: self.room_creation_channel_id.map(ChannelId),
            general_voice: self.general_voice_channel_id.map(ChannelId),
            platform_timeout: Duration::from_millis(self.platform_timeout_ms),
        }
    }
}

fn optional_id(key: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidId(key)),
        _ => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("DISCORD_TOKEN environment variable is required")]
    MissingToken,
    #[error("DISCORD_GUILD_ID environment variable is required")]
    MissingGuild,
    #[error("{0} must be a numeric Discord id")]
    InvalidId(&'static str),
}
