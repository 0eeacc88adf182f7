//! Deferred side effects requested by the pipelines.

use guildxp_core::types::PlatformId;
use guildxp_events::GuildEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChange {
    pub role_id: PlatformId,
    /// Audit reason, e.g. `"level:5"` or `"shop:vip-pass"`.
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub channel_id: PlatformId,
    pub content: String,
}

/// Everything a pipeline wants done once the profile mutation is committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideEffects {
    pub roles_to_add: Vec<RoleChange>,
    pub roles_to_remove: Vec<RoleChange>,
    pub messages: Vec<OutgoingMessage>,
    pub events: Vec<GuildEvent>,
}

impl SideEffects {
    pub fn is_empty(&self) -> bool {
        self.roles_to_add.is_empty()
            && self.roles_to_remove.is_empty()
            && self.messages.is_empty()
            && self.events.is_empty()
    }

    /// Append `other`, keeping its order after ours.
    pub fn extend(&mut self, other: SideEffects) {
        self.roles_to_add.extend(other.roles_to_add);
        self.roles_to_remove.extend(other.roles_to_remove);
        self.messages.extend(other.messages);
        self.events.extend(other.events);
    }

    pub fn add_role(&mut self, role_id: impl Into<PlatformId>, reason: impl Into<String>) {
        self.roles_to_add.push(RoleChange {
            role_id: role_id.into(),
            reason: reason.into(),
        });
    }

    pub fn remove_role(&mut self, role_id: impl Into<PlatformId>, reason: impl Into<String>) {
        self.roles_to_remove.push(RoleChange {
            role_id: role_id.into(),
            reason: reason.into(),
        });
    }

    /// Queue a message; dropped when there is nowhere to send it.
    pub fn send(&mut self, channel_id: Option<PlatformId>, content: String) {
        match channel_id {
            Some(channel_id) => self.messages.push(OutgoingMessage {
                channel_id,
                content,
            }),
            None => tracing::debug!("No channel for announcement, dropping it"),
        }
    }

    pub fn record(&mut self, event: GuildEvent) {
        self.events.push(event);
    }

    pub fn event_types(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.event_type.as_str()).collect()
    }
}
