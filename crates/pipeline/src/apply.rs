//! Applies a [`SideEffects`] bundle against the chat platform.
//!
//! Application is best effort: each role change and message is attempted
//! independently and a failure is logged and counted, never propagated, so
//! one missing permission cannot block the rest of the bundle. The profile
//! mutation that produced the bundle is already committed by then.

use std::sync::Arc;

use guildxp_core::config::LoggingConfig;
use guildxp_events::{EventBus, GuildEvent};

use crate::effects::SideEffects;
use crate::platform::{ChatPlatform, Member};

/// What actually happened while applying a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub roles_added: usize,
    pub roles_removed: usize,
    pub messages_sent: usize,
    pub log_lines: usize,
    pub failures: usize,
}

pub struct SideEffectApplier {
    platform: Arc<dyn ChatPlatform>,
    bus: Arc<EventBus>,
}

impl SideEffectApplier {
    pub fn new(platform: Arc<dyn ChatPlatform>, bus: Arc<EventBus>) -> Self {
        Self { platform, bus }
    }

    pub async fn apply(
        &self,
        guild_id: &str,
        user_id: &str,
        effects: SideEffects,
        logging: &LoggingConfig,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        if !effects.roles_to_add.is_empty() || !effects.roles_to_remove.is_empty() {
            self.apply_roles(guild_id, user_id, &effects, &mut report).await;
        }

        for message in &effects.messages {
            if self.deliver(guild_id, &message.channel_id, &message.content).await {
                report.messages_sent += 1;
            } else {
                report.failures += 1;
            }
        }

        for event in effects.events {
            if let Some(channel_id) = logging.route(&event.event_type) {
                if self.deliver(guild_id, channel_id, &log_line(&event)).await {
                    report.log_lines += 1;
                } else {
                    report.failures += 1;
                }
            }
            self.bus.publish(event);
        }

        report
    }

    async fn apply_roles(
        &self,
        guild_id: &str,
        user_id: &str,
        effects: &SideEffects,
        report: &mut ApplyReport,
    ) {
        let member: Member = match self.platform.fetch_member(guild_id, user_id).await {
            Ok(member) => member,
            Err(e) => {
                tracing::warn!(guild_id, user_id, error = %e, "Failed to fetch member, skipping role changes");
                report.failures += effects.roles_to_add.len() + effects.roles_to_remove.len();
                return;
            }
        };

        for change in &effects.roles_to_add {
            if member.has_role(&change.role_id) {
                continue;
            }
            match self
                .platform
                .add_role(guild_id, user_id, &change.role_id, &change.reason)
                .await
            {
                Ok(()) => report.roles_added += 1,
                Err(e) => {
                    tracing::warn!(guild_id, user_id, role_id = %change.role_id, error = %e, "Failed to add role");
                    report.failures += 1;
                }
            }
        }

        for change in &effects.roles_to_remove {
            if !member.has_role(&change.role_id) {
                continue;
            }
            match self
                .platform
                .remove_role(guild_id, user_id, &change.role_id, &change.reason)
                .await
            {
                Ok(()) => report.roles_removed += 1,
                Err(e) => {
                    tracing::warn!(guild_id, user_id, role_id = %change.role_id, error = %e, "Failed to remove role");
                    report.failures += 1;
                }
            }
        }
    }

    /// Send `content` to a channel that must exist in the guild.
    async fn deliver(&self, guild_id: &str, channel_id: &str, content: &str) -> bool {
        if let Err(e) = self.platform.fetch_channel(guild_id, channel_id).await {
            tracing::warn!(guild_id, channel_id, error = %e, "Announcement channel unavailable");
            return false;
        }
        match self.platform.send_message(channel_id, content).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(guild_id, channel_id, error = %e, "Failed to send message");
                false
            }
        }
    }
}

fn log_line(event: &GuildEvent) -> String {
    let who = event
        .user_id
        .as_deref()
        .map(|id| format!(" <@{id}>"))
        .unwrap_or_default();
    format!("`{}`{who} {}", event.event_type, event.payload)
}
