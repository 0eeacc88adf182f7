//! Platform stand-in for running the worker without a gateway connection.

use async_trait::async_trait;
use guildxp_pipeline::platform::{Channel, ChatPlatform, Member, PlatformError};

/// Accepts every request and logs it instead of calling the platform.
/// Members are reported with no roles, so every role grant is attempted.
#[derive(Debug, Default)]
pub struct DryRunPlatform;

#[async_trait]
impl ChatPlatform for DryRunPlatform {
    async fn fetch_channel(
        &self,
        _guild_id: &str,
        channel_id: &str,
    ) -> Result<Channel, PlatformError> {
        Ok(Channel {
            id: channel_id.to_string(),
            name: channel_id.to_string(),
        })
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), PlatformError> {
        tracing::info!(channel_id, content, "Dry run: send message");
        Ok(())
    }

    async fn fetch_member(&self, _guild_id: &str, user_id: &str) -> Result<Member, PlatformError> {
        Ok(Member {
            user_id: user_id.to_string(),
            role_ids: Default::default(),
        })
    }

    async fn add_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        tracing::info!(guild_id, user_id, role_id, reason, "Dry run: add role");
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        tracing::info!(guild_id, user_id, role_id, reason, "Dry run: remove role");
        Ok(())
    }
}
