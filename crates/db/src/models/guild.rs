//! Guild entity model.

use guildxp_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `guilds` table.
///
/// `config` is the sparse stored document; resolve it with
/// [`GuildConfig::from_stored`](guildxp_core::config::GuildConfig::from_stored).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Guild {
    pub id: DbId,
    pub discord_guild_id: String,
    pub config: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
