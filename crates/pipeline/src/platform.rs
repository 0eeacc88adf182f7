//! The chat platform as seen by the side-effect applier.

use std::collections::BTreeSet;

use async_trait::async_trait;
use guildxp_core::types::PlatformId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Missing permission: {0}")]
    Forbidden(String),

    /// Transport-level failure (network, rate limit, bad gateway).
    #[error("Platform request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: PlatformId,
    pub role_ids: BTreeSet<PlatformId>,
}

impl Member {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.contains(role_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: PlatformId,
    pub name: String,
}

/// Operations the worker needs from the chat platform.
///
/// Every call is a network round trip and may fail independently; callers
/// treat each one as best effort.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn fetch_channel(
        &self,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Channel, PlatformError>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), PlatformError>;

    async fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<Member, PlatformError>;

    async fn add_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;
}
