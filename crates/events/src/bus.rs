//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`GuildEvent`]s. It is
//! designed to be shared via `Arc<EventBus>` across the application.

use chrono::{DateTime, Utc};
use guildxp_core::types::PlatformId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Dot-separated audit event names.
pub mod kinds {
    pub const XP_GRANTED: &str = "xp.granted";
    pub const LEVEL_UP: &str = "level.up";
    pub const DAILY_CLAIMED: &str = "daily.claimed";
    pub const ACHIEVEMENT_UNLOCKED: &str = "achievement.unlocked";
    pub const QUEST_ACCEPTED: &str = "quest.accepted";
    pub const QUEST_COMPLETED: &str = "quest.completed";
    pub const QUEST_CLAIMED: &str = "quest.claimed";
    pub const SHOP_PURCHASE: &str = "shop.purchase";
    pub const TEMP_ROLE_GRANTED: &str = "role.temp_granted";
    pub const TEMP_ROLE_EXPIRED: &str = "role.temp_expired";
    pub const CONFIG_UPDATED: &str = "config.updated";
}

// ---------------------------------------------------------------------------
// GuildEvent
// ---------------------------------------------------------------------------

/// Something that happened to a member (or a guild) worth auditing.
///
/// Constructed via [`GuildEvent::new`] and enriched with the builder
/// methods [`with_guild`](GuildEvent::with_guild),
/// [`with_user`](GuildEvent::with_user), and
/// [`with_payload`](GuildEvent::with_payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildEvent {
    /// Dot-separated event name, e.g. `"level.up"`.
    pub event_type: String,

    /// Platform id of the guild the event belongs to.
    pub guild_id: Option<PlatformId>,

    /// Platform id of the member the event is about.
    pub user_id: Option<PlatformId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl GuildEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            guild_id: None,
            user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_guild(mut self, guild_id: impl Into<PlatformId>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<PlatformId>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`GuildEvent`].
pub struct EventBus {
    sender: broadcast::Sender<GuildEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: GuildEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<GuildEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = GuildEvent::new(kinds::LEVEL_UP)
            .with_guild("42")
            .with_user("7")
            .with_payload(serde_json::json!({"level": 3}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "level.up");
        assert_eq!(received.guild_id.as_deref(), Some("42"));
        assert_eq!(received.user_id.as_deref(), Some("7"));
        assert_eq!(received.payload["level"], 3);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(GuildEvent::new(kinds::QUEST_CLAIMED));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, "quest.claimed");
        assert_eq!(e2.event_type, "quest.claimed");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(GuildEvent::new("orphan.event"));
    }

    #[test]
    fn default_event_has_empty_optional_fields() {
        let event = GuildEvent::new("bare.event");
        assert!(event.guild_id.is_none());
        assert!(event.user_id.is_none());
        assert!(event.payload.is_object());
    }
}
