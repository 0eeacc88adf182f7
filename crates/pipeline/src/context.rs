use chrono::{DateTime, Utc};
use guildxp_core::types::{PlatformId, Timestamp};
use guildxp_events::GuildEvent;

/// Who did what, where and when. Threaded through every pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityContext {
    pub guild_id: PlatformId,
    pub user_id: PlatformId,
    /// Channel the activity happened in, if any. Fallback target for
    /// announcements without a configured channel.
    pub channel_id: Option<PlatformId>,
    pub now: Timestamp,
}

impl ActivityContext {
    pub fn new(
        guild_id: impl Into<PlatformId>,
        user_id: impl Into<PlatformId>,
        now: Timestamp,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
            channel_id: None,
            now,
        }
    }

    pub fn in_channel(mut self, channel_id: impl Into<PlatformId>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    /// Platform mention markup for the acting member.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }

    /// An audit event stamped with this activity's guild, member and time.
    pub fn event(&self, kind: &str, payload: serde_json::Value) -> GuildEvent {
        GuildEvent::new(kind)
            .with_guild(self.guild_id.clone())
            .with_user(self.user_id.clone())
            .with_payload(payload)
            .at(self.now)
    }

    /// First configured channel, else the activity channel.
    pub fn target_channel(&self, configured: Option<&PlatformId>) -> Option<PlatformId> {
        configured.cloned().or_else(|| self.channel_id.clone())
    }
}

/// `at + delta`, clamped to the latest representable time when `delta` is
/// out of range or the sum overflows.
pub(crate) fn later(at: Timestamp, delta: Option<chrono::Duration>) -> Timestamp {
    delta
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
