//! Per-guild profile row.

use guildxp_core::profile::{Achievements, Inventory, Profile, QuestStates, TempRoles, UserStats};
use guildxp_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `user_guild_profiles` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: DbId,
    pub guild_id: DbId,
    pub xp: i64,
    pub level: i32,
    pub gold: i64,
    pub streak_count: i32,
    pub last_daily_at: Option<Timestamp>,
    pub last_message_at: Option<Timestamp>,
    pub inventory: Json<Inventory>,
    pub temp_roles: Json<TempRoles>,
    pub user_stats: Json<UserStats>,
    pub achievements: Json<Achievements>,
    pub quests: Json<QuestStates>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            guild_id: row.guild_id,
            xp: row.xp,
            level: row.level,
            gold: row.gold,
            streak_count: row.streak_count,
            last_daily_at: row.last_daily_at,
            last_message_at: row.last_message_at,
            inventory: row.inventory.0,
            temp_roles: row.temp_roles.0,
            user_stats: row.user_stats.0,
            achievements: row.achievements.0,
            quests: row.quests.0,
        }
    }
}
