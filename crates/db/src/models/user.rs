//! User identity model.

use guildxp_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table, mapping a platform user to an internal id.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub discord_user_id: String,
    pub created_at: Timestamp,
}
