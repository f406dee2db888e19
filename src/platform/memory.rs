//! In-memory platform used by the test suites.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use super::{ChannelId, MuteLevel, PlatformError, RoleRef, UserId, VoicePlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Op {
    CreateChannel,
    Move,
    Permission,
    Delete,
    DirectMessage,
    Members,
}

#[derive(Default)]
pub(crate) struct MemoryPlatform {
    next_channel: AtomicU64,
    voice_states: DashMap<UserId, ChannelId>,
    channels: DashMap<ChannelId, (String, u32)>,
    connect_allowed: DashMap<ChannelId, bool>,
    mutes: DashMap<UserId, MuteLevel>,
    messages: Mutex<Vec<(UserId, String)>>,
    deleted: Mutex<Vec<ChannelId>>,
    failing: Mutex<HashSet<Op>>,
    stalled: Mutex<HashSet<Op>>,
    failing_mutes: DashSet<UserId>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryPlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Put a user into a voice channel without going through `move_participant`.
    pub(crate) fn connect(&self, user: UserId, channel: ChannelId) {
        self.voice_states.insert(user, channel);
    }

    pub(crate) fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub(crate) fn stall(&self, op: Op) {
        self.stalled.lock().unwrap().insert(op);
    }

    pub(crate) fn fail_mute_for(&self, user: UserId) {
        self.failing_mutes.insert(user);
    }

    pub(crate) fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub(crate) fn location_of(&self, user: UserId) -> Option<ChannelId> {
        self.voice_states.get(&user).map(|c| *c)
    }

    pub(crate) fn channel(&self, channel: ChannelId) -> Option<(String, u32)> {
        self.channels.get(&channel).map(|c| c.clone())
    }

    pub(crate) fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub(crate) fn connect_allowed(&self, channel: ChannelId) -> Option<bool> {
        self.connect_allowed.get(&channel).map(|a| *a)
    }

    pub(crate) fn mute_of(&self, user: UserId) -> Option<MuteLevel> {
        self.mutes.get(&user).map(|m| *m)
    }

    pub(crate) fn messages(&self) -> Vec<(UserId, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn deleted(&self) -> Vec<ChannelId> {
        self.deleted.lock().unwrap().clone()
    }

    async fn enter(&self, op: Op) -> Result<(), PlatformError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let stalled = self.stalled.lock().unwrap().contains(&op);
        if stalled {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(&op) {
            return Err(PlatformError::Api {
                status: 500,
                body: format!("{:?} failed", op),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VoicePlatform for MemoryPlatform {
    async fn create_voice_channel(
        &self,
        name: &str,
        user_limit: u32,
    ) -> Result<ChannelId, PlatformError> {
        self.enter(Op::CreateChannel).await?;
        let id = ChannelId(1000 + self.next_channel.fetch_add(1, Ordering::SeqCst));
        self.channels.insert(id, (name.to_string(), user_limit));
        Ok(id)
    }

    async fn move_participant(
        &self,
        user: UserId,
        channel: ChannelId,
    ) -> Result<(), PlatformError> {
        self.enter(Op::Move).await?;
        self.voice_states.insert(user, channel);
        Ok(())
    }

    async fn set_connect_permission(
        &self,
        channel: ChannelId,
        role: RoleRef,
        allow: bool,
    ) -> Result<(), PlatformError> {
        self.enter(Op::Permission).await?;
        assert_eq!(role, RoleRef::Everyone);
        self.connect_allowed.insert(channel, allow);
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        self.deleted.lock().unwrap().push(channel);
        self.enter(Op::Delete).await?;
        self.channels.remove(&channel);
        self.voice_states.retain(|_, c| *c != channel);
        Ok(())
    }

    async fn mute_participant(
        &self,
        user: UserId,
        level: MuteLevel,
    ) -> Result<(), PlatformError> {
        if self.failing_mutes.contains(&user) {
            return Err(PlatformError::Http("member unreachable".to_string()));
        }
        self.mutes.insert(user, level);
        Ok(())
    }

    async fn send_direct_message(&self, user: UserId, text: &str) -> Result<(), PlatformError> {
        self.enter(Op::DirectMessage).await?;
        self.messages.lock().unwrap().push((user, text.to_string()));
        Ok(())
    }

    async fn voice_channel_of(&self, user: UserId) -> Result<Option<ChannelId>, PlatformError> {
        Ok(self.location_of(user))
    }

    async fn channel_members(&self, channel: ChannelId) -> Result<Vec<UserId>, PlatformError> {
        self.enter(Op::Members).await?;
        let mut members: Vec<UserId> = self
            .voice_states
            .iter()
            .filter(|entry| *entry.value() == channel)
            .map(|entry| *entry.key())
            .collect();
        members.sort();
        Ok(members)
    }
}
