use crate::platform::{MuteLevel, PlatformError, UserId};

/// Result of a best-effort platform side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Applied,
    /// Nothing to do under the current settings
    Skipped,
    Failed(String),
}

impl Effect {
    pub fn from_result<T>(result: Result<T, PlatformError>) -> Self {
        match result {
            Ok(_) => Effect::Applied,
            Err(e) => Effect::Failed(e.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Effect::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOutcome {
    /// In-memory lock state after the toggle
    pub locked: bool,
    pub permission: Effect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub level: MuteLevel,
    pub muted: Vec<UserId>,
    pub failed: Vec<(UserId, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The room was no longer registered; nothing was torn down
    AlreadyClosed,
    Closed {
        members_moved: Effect,
        channel_deleted: Effect,
    },
}

impl CloseOutcome {
    pub fn was_closed(&self) -> bool {
        matches!(self, CloseOutcome::Closed { .. })
    }
}
