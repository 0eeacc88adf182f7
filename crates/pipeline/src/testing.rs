//! In-memory [`ChatPlatform`] for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use guildxp_core::types::PlatformId;

use crate::platform::{Channel, ChatPlatform, Member, PlatformError};

#[derive(Debug, Default)]
struct Recorded {
    channels: BTreeSet<PlatformId>,
    members: BTreeMap<PlatformId, BTreeSet<PlatformId>>,
    sent: Vec<(PlatformId, String)>,
    forbidden_roles: BTreeSet<PlatformId>,
}

/// In-memory platform that records every call. Channels must be registered
/// to accept messages; members are created on first fetch.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    state: Mutex<Recorded>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PlatformId>,
    {
        let platform = Self::new();
        platform.lock().channels.extend(channels.into_iter().map(Into::into));
        platform
    }

    /// Make every `add_role` for `role_id` fail with `Forbidden`.
    pub fn forbid_role(&self, role_id: impl Into<PlatformId>) {
        self.lock().forbidden_roles.insert(role_id.into());
    }

    pub fn give_role(&self, user_id: &str, role_id: impl Into<PlatformId>) {
        self.lock()
            .members
            .entry(user_id.to_string())
            .or_default()
            .insert(role_id.into());
    }

    pub fn roles_of(&self, user_id: &str) -> BTreeSet<PlatformId> {
        self.lock().members.get(user_id).cloned().unwrap_or_default()
    }

    pub fn sent(&self) -> Vec<(PlatformId, String)> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        // A poisoned lock only means a test already panicked.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn fetch_channel(
        &self,
        _guild_id: &str,
        channel_id: &str,
    ) -> Result<Channel, PlatformError> {
        if self.lock().channels.contains(channel_id) {
            Ok(Channel {
                id: channel_id.to_string(),
                name: format!("channel-{channel_id}"),
            })
        } else {
            Err(PlatformError::NotFound {
                entity: "channel",
                id: channel_id.to_string(),
            })
        }
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), PlatformError> {
        self.lock()
            .sent
            .push((channel_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn fetch_member(&self, _guild_id: &str, user_id: &str) -> Result<Member, PlatformError> {
        let role_ids = self.roles_of(user_id);
        Ok(Member {
            user_id: user_id.to_string(),
            role_ids,
        })
    }

    async fn add_role(
        &self,
        _guild_id: &str,
        user_id: &str,
        role_id: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.lock();
        if state.forbidden_roles.contains(role_id) {
            return Err(PlatformError::Forbidden(format!("manage role {role_id}")));
        }
        state
            .members
            .entry(user_id.to_string())
            .or_default()
            .insert(role_id.to_string());
        Ok(())
    }

    async fn remove_role(
        &self,
        _guild_id: &str,
        user_id: &str,
        role_id: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        if let Some(roles) = self.lock().members.get_mut(user_id) {
            roles.remove(role_id);
        }
        Ok(())
    }
}
