//! Audit event models.

use guildxp_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the append-only `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    pub event_type: String,
    pub discord_guild_id: Option<String>,
    pub discord_user_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for inserting an audit event.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub event_type: String,
    pub discord_guild_id: Option<String>,
    pub discord_user_id: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}
