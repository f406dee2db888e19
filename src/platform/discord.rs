use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{ChannelId, MuteLevel, PlatformError, RoleRef, UserId, VoicePlatform};
use crate::config::Config;

/// Discord channel type for guild voice channels
const GUILD_VOICE: u8 = 2;

/// CONNECT permission bit
const CONNECT: u64 = 1 << 20;

/// Overwrite target type for roles
const OVERWRITE_ROLE: u8 = 0;

/// `VoicePlatform` backed by the Discord REST API.
///
/// REST has no endpoint listing the occupants of a voice channel, so the
/// adapter keeps a voice-state cache. Occupant listing stays unavailable until
/// a gateway listener starts feeding `record_voice_state`; before that the
/// cache only knows users the adapter moved itself.
pub struct DiscordPlatform {
    client: Client,
    api_base: String,
    token: String,
    guild_id: u64,
    category_id: Option<u64>,
    voice_states: DashMap<UserId, ChannelId>,
    gateway_attached: AtomicBool,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct VoiceState {
    channel_id: Option<String>,
}

impl DiscordPlatform {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_base: config.discord_api_base.trim_end_matches('/').to_string(),
            token: config.discord_token.clone(),
            guild_id: config.discord_guild_id,
            category_id: config.room_category_id,
            voice_states: DashMap::new(),
            gateway_attached: AtomicBool::new(false),
        }
    }

    /// Feed a voice state update observed on the gateway.
    pub fn record_voice_state(&self, user: UserId, channel: Option<ChannelId>) {
        self.gateway_attached.store(true, Ordering::Release);
        self.cache_voice_state(user, channel);
    }

    fn cache_voice_state(&self, user: UserId, channel: Option<ChannelId>) {
        match channel {
            Some(channel) => {
                self.voice_states.insert(user, channel);
            }
            None => {
                self.voice_states.remove(&user);
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn member_url(&self, user: UserId) -> String {
        self.url(&format!("/guilds/{}/members/{}", self.guild_id, user))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let res = request
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(PlatformError::Api { status, body });
        }

        Ok(res)
    }

    fn overwrite_target(&self, role: RoleRef) -> u64 {
        match role {
            RoleRef::Everyone => self.guild_id,
            RoleRef::Role(id) => id,
        }
    }
}

fn parse_snowflake(raw: &str) -> Result<u64, PlatformError> {
    raw.parse()
        .map_err(|_| PlatformError::Decode(format!("invalid snowflake '{}'", raw)))
}

fn connect_overwrite(allow: bool) -> serde_json::Value {
    let (allow_bits, deny_bits) = if allow { (CONNECT, 0) } else { (0, CONNECT) };
    json!({
        "type": OVERWRITE_ROLE,
        "allow": allow_bits.to_string(),
        "deny": deny_bits.to_string(),
    })
}

fn create_channel_body(name: &str, user_limit: u32, parent_id: Option<u64>) -> serde_json::Value {
    let mut body = json!({
        "name": name,
        "type": GUILD_VOICE,
        "user_limit": user_limit,
    });
    if let Some(parent) = parent_id {
        body["parent_id"] = json!(parent.to_string());
    }
    body
}

#[async_trait]
impl VoicePlatform for DiscordPlatform {
    async fn create_voice_channel(
        &self,
        name: &str,
        user_limit: u32,
    ) -> Result<ChannelId, PlatformError> {
        let body = create_channel_body(name, user_limit, self.category_id);
        let res = self
            .send(
                self.client
                    .post(self.url(&format!("/guilds/{}/channels", self.guild_id)))
                    .json(&body),
            )
            .await?;

        let created: Created = res.json().await?;
        let id = ChannelId(parse_snowflake(&created.id)?);

        tracing::debug!(channel = %id, name = %name, "Voice channel created");
        Ok(id)
    }

    async fn move_participant(
        &self,
        user: UserId,
        channel: ChannelId,
    ) -> Result<(), PlatformError> {
        self.send(
            self.client
                .patch(self.member_url(user))
                .json(&json!({ "channel_id": channel.to_string() })),
        )
        .await?;

        self.voice_states.insert(user, channel);
        Ok(())
    }

    async fn set_connect_permission(
        &self,
        channel: ChannelId,
        role: RoleRef,
        allow: bool,
    ) -> Result<(), PlatformError> {
        let target = self.overwrite_target(role);
        self.send(
            self.client
                .put(self.url(&format!("/channels/{}/permissions/{}", channel, target)))
                .json(&connect_overwrite(allow)),
        )
        .await?;
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        self.send(self.client.delete(self.url(&format!("/channels/{}", channel))))
            .await?;

        self.voice_states.retain(|_, c| *c != channel);
        Ok(())
    }

    async fn mute_participant(
        &self,
        user: UserId,
        level: MuteLevel,
    ) -> Result<(), PlatformError> {
        self.send(self.client.patch(self.member_url(user)).json(&json!({
            "mute": level.is_muted(),
            "deaf": level.is_deafened(),
        })))
        .await?;
        Ok(())
    }

    async fn send_direct_message(&self, user: UserId, text: &str) -> Result<(), PlatformError> {
        let res = self
            .send(
                self.client
                    .post(self.url("/users/@me/channels"))
                    .json(&json!({ "recipient_id": user.to_string() })),
            )
            .await?;
        let dm: Created = res.json().await?;

        self.send(
            self.client
                .post(self.url(&format!("/channels/{}/messages", dm.id)))
                .json(&json!({ "content": text })),
        )
        .await?;
        Ok(())
    }

    async fn voice_channel_of(&self, user: UserId) -> Result<Option<ChannelId>, PlatformError> {
        let res = self
            .send(self.client.get(self.url(&format!(
                "/guilds/{}/voice-states/{}",
                self.guild_id, user
            ))))
            .await;

        let state: VoiceState = match res {
            Ok(res) => res.json().await?,
            // Discord answers 404 (Unknown Voice State) for members not in voice
            Err(PlatformError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                self.cache_voice_state(user, None);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let channel = state
            .channel_id
            .as_deref()
            .map(parse_snowflake)
            .transpose()?
            .map(ChannelId);
        self.cache_voice_state(user, channel);
        Ok(channel)
    }

    async fn channel_members(&self, channel: ChannelId) -> Result<Vec<UserId>, PlatformError> {
        if !self.gateway_attached.load(Ordering::Acquire) {
            return Err(PlatformError::Unavailable(
                "voice channel occupants need a gateway voice state feed".to_string(),
            ));
        }

        Ok(self
            .voice_states
            .iter()
            .filter(|entry| *entry.value() == channel)
            .map(|entry| *entry.key())
            .collect())
    }
}
