pub mod discord;
#[cfg(test)]
pub(crate) mod memory;

pub use discord::DiscordPlatform;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snowflake of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Snowflake of a platform channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a permission overwrite applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRef {
    /// The default role every member of the guild carries
    Everyone,
    Role(u64),
}

/// Voice restriction applied to every occupant of a room on refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MuteLevel {
    #[default]
    Open = 0,
    Muted = 1,
    Deafened = 2,
}

impl MuteLevel {
    pub fn is_muted(self) -> bool {
        self != MuteLevel::Open
    }

    pub fn is_deafened(self) -> bool {
        self == MuteLevel::Deafened
    }
}

impl From<MuteLevel> for u8 {
    fn from(level: MuteLevel) -> Self {
        level as u8
    }
}

impl TryFrom<u8> for MuteLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MuteLevel::Open),
            1 => Ok(MuteLevel::Muted),
            2 => Ok(MuteLevel::Deafened),
            other => Err(format!("unknown mute level {}", other)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Platform API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected platform response: {0}")]
    Decode(String),

    #[error("Not available: {0}")]
    Unavailable(String),

    #[error("Platform call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        PlatformError::Http(err.to_string())
    }
}

/// Primitives the room core needs from the voice platform.
///
/// Every call may fail independently; callers decide whether a failure is
/// fatal (room provisioning) or best-effort (everything else).
#[async_trait]
pub trait VoicePlatform: Send + Sync {
    async fn create_voice_channel(
        &self,
        name: &str,
        user_limit: u32,
    ) -> Result<ChannelId, PlatformError>;

    async fn move_participant(&self, user: UserId, channel: ChannelId)
        -> Result<(), PlatformError>;

    async fn set_connect_permission(
        &self,
        channel: ChannelId,
        role: RoleRef,
        allow: bool,
    ) -> Result<(), PlatformError>;

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    async fn mute_participant(&self, user: UserId, level: MuteLevel)
        -> Result<(), PlatformError>;

    async fn send_direct_message(&self, user: UserId, text: &str) -> Result<(), PlatformError>;

    /// Voice channel the user is connected to, if any
    async fn voice_channel_of(&self, user: UserId) -> Result<Option<ChannelId>, PlatformError>;

    async fn channel_members(&self, channel: ChannelId) -> Result<Vec<UserId>, PlatformError>;
}

/// Run a platform call with an upper bound on how long it may suspend.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, PlatformError>
where
    F: Future<Output = Result<T, PlatformError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PlatformError::Timeout(limit)),
    }
}
