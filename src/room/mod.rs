pub mod outcome;
pub mod registry;

pub use outcome::{CloseOutcome, Effect, LockOutcome, RefreshReport};
pub use registry::{RoomAlreadyExists, RoomRegistry};

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::RwLock;

use crate::platform::{bounded, ChannelId, MuteLevel, PlatformError, RoleRef, UserId, VoicePlatform};
use crate::security::{self, RoomSecret};

/// Settings snapshot shared by every room created under one configuration.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub room_prefix: String,
    pub max_users_in_room: u32,
    /// Pairing server advertised to clients in the pairing code
    pub bot_server_url: String,
    /// Staging channel owners must sit in to create a room
    pub room_creation_voice: Option<ChannelId>,
    /// Where occupants are sent when their room closes
    pub general_voice: Option<ChannelId>,
    pub platform_timeout: Duration,
}

/// Participant asking for a room
#[derive(Debug, Clone)]
pub struct Owner {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateRoomError {
    #[error("You already have an active room")]
    RoomAlreadyExists,

    #[error("You need to be connected to a voice channel to create a room")]
    UserNotInVoice,

    #[error("Join the room creation voice channel to create a room")]
    UserNotInRoomCreationVoice,

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl From<RoomAlreadyExists> for CreateRoomError {
    fn from(_: RoomAlreadyExists) -> Self {
        CreateRoomError::RoomAlreadyExists
    }
}

/// Mutable part of a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub locked: bool,
    pub mute_level: MuteLevel,
    pub room_code: Option<String>,
    pub last_alive_at: DateTime<Utc>,
}

/// A voice room bound to one owner and one provisioned channel.
pub struct Room {
    owner: UserId,
    owner_name: String,
    owner_display_name: String,
    settings: Arc<RoomSettings>,
    voice_channel: ChannelId,
    secret: RoomSecret,
    secret_delivery: Effect,
    created_at: DateTime<Utc>,
    platform: Arc<dyn VoicePlatform>,
    registry: Weak<RoomRegistry>,
    state: RwLock<RoomSnapshot>,
}

impl Room {
    /// Validate, provision and register a room for `owner`.
    ///
    /// Steps run in order: registry claim, voice presence, staging channel,
    /// secret + DM, channel creation, owner move, registration. Nothing is
    /// left registered if any fatal step fails.
    pub async fn create(
        owner: Owner,
        settings: Arc<RoomSettings>,
        platform: Arc<dyn VoicePlatform>,
        registry: &Arc<RoomRegistry>,
    ) -> Result<Arc<Room>, CreateRoomError> {
        let reservation = registry.reserve(owner.id)?;
        let limit = settings.platform_timeout;

        let current = bounded(limit, platform.voice_channel_of(owner.id))
            .await?
            .ok_or(CreateRoomError::UserNotInVoice)?;

        if let Some(staging) = settings.room_creation_voice {
            if current != staging {
                return Err(CreateRoomError::UserNotInRoomCreationVoice);
            }
        }

        let secret = security::generate_secret();
        let code = security::pairing_code(&settings.bot_server_url, &secret.plain);
        let secret_delivery = Effect::from_result(
            bounded(limit, platform.send_direct_message(owner.id, &secret_message(&code))).await,
        );
        if let Effect::Failed(reason) = &secret_delivery {
            tracing::warn!(owner = %owner.id, error = %reason, "Could not deliver room key to owner");
        }

        let name = format!("{}{}", settings.room_prefix, owner.name);
        let voice_channel = bounded(
            limit,
            platform.create_voice_channel(&name, settings.max_users_in_room),
        )
        .await?;

        if let Err(e) = bounded(limit, platform.move_participant(owner.id, voice_channel)).await {
            if let Err(cleanup) = bounded(limit, platform.delete_channel(voice_channel)).await {
                tracing::warn!(
                    owner = %owner.id,
                    channel = %voice_channel,
                    error = %cleanup,
                    "Could not delete channel of failed room"
                );
            }
            return Err(e.into());
        }

        let now = Utc::now();
        let room = Arc::new(Room {
            owner: owner.id,
            owner_display_name: security::sanitize_display_name(&owner.name),
            owner_name: owner.name,
            settings,
            voice_channel,
            secret,
            secret_delivery,
            created_at: now,
            platform,
            registry: Arc::downgrade(registry),
            state: RwLock::new(RoomSnapshot {
                locked: false,
                mute_level: MuteLevel::Open,
                room_code: None,
                last_alive_at: now,
            }),
        });
        reservation.commit(room.clone());

        tracing::info!(
            owner = %room.owner,
            channel = %room.voice_channel,
            name = %name,
            "Room created"
        );
        Ok(room)
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn owner_display_name(&self) -> &str {
        &self.owner_display_name
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn voice_channel(&self) -> ChannelId {
        self.voice_channel
    }

    pub fn secret_plain(&self) -> &str {
        &self.secret.plain
    }

    pub fn secret_encoded(&self) -> &str {
        &self.secret.encoded
    }

    /// Whether the owner received the pairing code at creation
    pub fn secret_delivery(&self) -> &Effect {
        &self.secret_delivery
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn pairing_code(&self) -> String {
        security::pairing_code(&self.settings.bot_server_url, &self.secret.plain)
    }

    /// False once the room was closed or replaced in the registry.
    pub fn is_registered(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.is_registered(self))
            .unwrap_or(false)
    }

    pub async fn snapshot(&self) -> RoomSnapshot {
        self.state.read().await.clone()
    }

    /// Liveness heartbeat
    pub async fn touch(&self) {
        self.state.write().await.last_alive_at = Utc::now();
    }

    /// Takes effect on the next `refresh`.
    pub async fn set_mute_level(&self, level: MuteLevel) {
        self.state.write().await.mute_level = level;
    }

    /// Store a six-letter room code. Anything else is ignored.
    pub async fn set_code(&self, candidate: &str) -> bool {
        tracing::debug!(owner = %self.owner, code = %candidate, "Setting room code");

        if !security::is_valid_room_code(candidate) {
            return false;
        }

        self.state.write().await.room_code = Some(candidate.to_string());
        true
    }

    /// Flip the lock. The in-memory flag is authoritative even when the
    /// platform rejects the permission change.
    pub async fn lock_toggle(&self) -> LockOutcome {
        let locked = {
            let mut state = self.state.write().await;
            state.locked = !state.locked;
            state.locked
        };

        let result = self
            .call(self.platform.set_connect_permission(
                self.voice_channel,
                RoleRef::Everyone,
                !locked,
            ))
            .await;
        if let Err(e) = &result {
            tracing::warn!(owner = %self.owner, locked, error = %e, "Unable to apply room lock");
        }

        LockOutcome {
            locked,
            permission: Effect::from_result(result),
        }
    }

    /// Apply the current mute level to every occupant.
    pub async fn refresh(&self) -> RefreshReport {
        let level = self.state.read().await.mute_level;

        let members = match self.call(self.platform.channel_members(self.voice_channel)).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(owner = %self.owner, error = %e, "Unable to list room members");
                return RefreshReport {
                    level,
                    ..Default::default()
                };
            }
        };

        let results = join_all(
            members
                .iter()
                .map(|&member| self.call(self.platform.mute_participant(member, level))),
        )
        .await;

        let mut report = RefreshReport {
            level,
            ..Default::default()
        };
        for (member, result) in members.into_iter().zip(results) {
            match result {
                Ok(()) => report.muted.push(member),
                Err(e) => {
                    tracing::warn!(owner = %self.owner, member = %member, error = %e, "Unable to mute member");
                    report.failed.push((member, e.to_string()));
                }
            }
        }

        tracing::debug!(
            owner = %self.owner,
            muted = report.muted.len(),
            failed = report.failed.len(),
            "Room refreshed"
        );
        report
    }

    /// Deregister, then tear down. Only the first call does anything.
    pub async fn close(&self) -> CloseOutcome {
        let removed = self
            .registry
            .upgrade()
            .and_then(|registry| registry.deregister(self));
        if removed.is_none() {
            tracing::debug!(owner = %self.owner, "Room already closed");
            return CloseOutcome::AlreadyClosed;
        }

        let members_moved = match self.settings.general_voice {
            Some(general) => self.move_members_to(general).await,
            None => Effect::Skipped,
        };

        let channel_deleted =
            Effect::from_result(self.call(self.platform.delete_channel(self.voice_channel)).await);
        if let Effect::Failed(reason) = &channel_deleted {
            tracing::warn!(
                owner = %self.owner,
                channel = %self.voice_channel,
                error = %reason,
                "Couldn't delete voice room"
            );
        }

        tracing::info!(owner = %self.owner, channel = %self.voice_channel, "Room closed");
        CloseOutcome::Closed {
            members_moved,
            channel_deleted,
        }
    }

    async fn move_members_to(&self, target: ChannelId) -> Effect {
        let members = match self.call(self.platform.channel_members(self.voice_channel)).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!(owner = %self.owner, error = %e, "Couldn't move users");
                return Effect::Failed(e.to_string());
            }
        };

        let failures: Vec<String> = join_all(
            members
                .iter()
                .map(|&member| self.call(self.platform.move_participant(member, target))),
        )
        .await
        .into_iter()
        .filter_map(|result| result.err().map(|e| e.to_string()))
        .collect();

        if failures.is_empty() {
            Effect::Applied
        } else {
            tracing::warn!(
                owner = %self.owner,
                failed = failures.len(),
                "Couldn't move users"
            );
            Effect::Failed(failures.join("; "))
        }
    }

    async fn call<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, PlatformError>>,
    ) -> Result<T, PlatformError> {
        bounded(self.settings.platform_timeout, call).await
    }
}

fn secret_message(code: &str) -> String {
    format!(
        "Your room's key is ```{}```\nPut it in your client to mute automatically.\n",
        code
    )
}
