//! Repository for the `guilds` table.

use guildxp_core::types::DbId;
use sqlx::PgPool;

use crate::models::guild::Guild;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, discord_guild_id, config, created_at, updated_at";

/// Provides lookups and config writes for guilds.
pub struct GuildRepo;

impl GuildRepo {
    /// Insert the guild if it is new, returning the (possibly existing) row.
    pub async fn upsert(pool: &PgPool, discord_guild_id: &str) -> Result<Guild, sqlx::Error> {
        let query = format!(
            "INSERT INTO guilds (discord_guild_id)
             VALUES ($1)
             ON CONFLICT (discord_guild_id) DO UPDATE SET
                discord_guild_id = EXCLUDED.discord_guild_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Guild>(&query)
            .bind(discord_guild_id)
            .fetch_one(pool)
            .await
    }

    /// Find a guild by its platform id.
    pub async fn find_by_discord_id(
        pool: &PgPool,
        discord_guild_id: &str,
    ) -> Result<Option<Guild>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM guilds WHERE discord_guild_id = $1");
        sqlx::query_as::<_, Guild>(&query)
            .bind(discord_guild_id)
            .fetch_optional(pool)
            .await
    }

    /// Replace the stored config document. Returns `None` if the guild is gone.
    pub async fn update_config(
        pool: &PgPool,
        id: DbId,
        config: &serde_json::Value,
    ) -> Result<Option<Guild>, sqlx::Error> {
        let query = format!(
            "UPDATE guilds SET config = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Guild>(&query)
            .bind(id)
            .bind(config)
            .fetch_optional(pool)
            .await
    }
}
