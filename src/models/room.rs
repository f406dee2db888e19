use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::MuteLevel;
use crate::room::{CloseOutcome, LockOutcome, RefreshReport, Room, RoomSnapshot};

/// Room state returned to paired clients
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatus {
    pub owner_id: String,
    pub owner: String,
    pub channel_id: String,
    pub locked: bool,
    pub mute_level: MuteLevel,
    pub room_code: Option<String>,
    pub last_alive_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RoomStatus {
    pub fn new(room: &Room, snapshot: RoomSnapshot) -> Self {
        Self {
            owner_id: room.owner().to_string(),
            owner: room.owner_display_name().to_string(),
            channel_id: room.voice_channel().to_string(),
            locked: snapshot.locked,
            mute_level: snapshot.mute_level,
            room_code: snapshot.room_code,
            last_alive_at: snapshot.last_alive_at,
            created_at: room.created_at(),
        }
    }
}

/// Request to set the room code
#[derive(Debug, Deserialize)]
pub struct SetCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SetCodeResponse {
    pub accepted: bool,
}

/// Request to change the mute level; validated by the handler
#[derive(Debug, Deserialize)]
pub struct SetMuteRequest {
    pub level: u8,
}

#[derive(Debug, Serialize)]
pub struct MuteFailure {
    pub user_id: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub level: MuteLevel,
    pub muted: Vec<String>,
    pub failed: Vec<MuteFailure>,
}

impl From<RefreshReport> for RefreshResponse {
    fn from(report: RefreshReport) -> Self {
        Self {
            level: report.level,
            muted: report.muted.iter().map(ToString::to_string).collect(),
            failed: report
                .failed
                .into_iter()
                .map(|(user, error)| MuteFailure {
                    user_id: user.to_string(),
                    error,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub locked: bool,
    /// Whether the platform accepted the permission change
    pub applied: bool,
}

impl From<LockOutcome> for LockResponse {
    fn from(outcome: LockOutcome) -> Self {
        Self {
            locked: outcome.locked,
            applied: !outcome.permission.is_failed(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub closed: bool,
}

impl From<CloseOutcome> for CloseResponse {
    fn from(outcome: CloseOutcome) -> Self {
        Self {
            closed: outcome.was_closed(),
        }
    }
}
