//! Repository for the `user_guild_profiles` table.

use guildxp_core::profile::ProfilePatch;
use guildxp_core::types::DbId;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::profile::ProfileRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "user_id, guild_id, xp, level, gold, streak_count, last_daily_at, \
                       last_message_at, inventory, temp_roles, user_stats, achievements, \
                       quests, created_at, updated_at";

/// Provides load, create and coalesced update operations for profiles.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Ensure a profile row exists, then read it back.
    ///
    /// Returns `None` only if the row vanished between the insert and the
    /// select, which callers treat as fatal.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
        guild_id: DbId,
    ) -> Result<Option<ProfileRow>, sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_guild_profiles (user_id, guild_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, guild_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(guild_id)
        .execute(pool)
        .await?;

        Self::find(pool, user_id, guild_id).await
    }

    /// Find a profile by its (user, guild) pair.
    pub async fn find(
        pool: &PgPool,
        user_id: DbId,
        guild_id: DbId,
    ) -> Result<Option<ProfileRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_guild_profiles
             WHERE user_id = $1 AND guild_id = $2"
        );
        sqlx::query_as::<_, ProfileRow>(&query)
            .bind(user_id)
            .bind(guild_id)
            .fetch_optional(pool)
            .await
    }

    /// Write every patched column in one `UPDATE ... RETURNING` statement.
    ///
    /// An empty patch issues no statement and just re-reads the row.
    pub async fn apply_patch(
        pool: &PgPool,
        user_id: DbId,
        guild_id: DbId,
        patch: &ProfilePatch,
    ) -> Result<Option<ProfileRow>, sqlx::Error> {
        if patch.is_empty() {
            return Self::find(pool, user_id, guild_id).await;
        }
        let mut builder = build_update(user_id, guild_id, patch);
        builder
            .build_query_as::<ProfileRow>()
            .fetch_optional(pool)
            .await
    }
}

/// Build the coalesced update for the columns named in `patch`.
///
/// JSON columns are bound wholesale. `updated_at` is always refreshed.
pub(crate) fn build_update(
    user_id: DbId,
    guild_id: DbId,
    patch: &ProfilePatch,
) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE user_guild_profiles SET ");

    {
        let mut set = builder.separated(", ");
        if let Some(xp) = patch.xp {
            set.push("xp = ").push_bind_unseparated(xp);
        }
        if let Some(level) = patch.level {
            set.push("level = ").push_bind_unseparated(level);
        }
        if let Some(gold) = patch.gold {
            set.push("gold = ").push_bind_unseparated(gold);
        }
        if let Some(streak) = patch.streak_count {
            set.push("streak_count = ").push_bind_unseparated(streak);
        }
        if let Some(at) = patch.last_daily_at {
            set.push("last_daily_at = ").push_bind_unseparated(at);
        }
        if let Some(at) = patch.last_message_at {
            set.push("last_message_at = ").push_bind_unseparated(at);
        }
        if let Some(inventory) = &patch.inventory {
            set.push("inventory = ")
                .push_bind_unseparated(Json(inventory.clone()));
        }
        if let Some(temp_roles) = &patch.temp_roles {
            set.push("temp_roles = ")
                .push_bind_unseparated(Json(temp_roles.clone()));
        }
        if let Some(stats) = &patch.user_stats {
            set.push("user_stats = ")
                .push_bind_unseparated(Json(stats.clone()));
        }
        if let Some(achievements) = &patch.achievements {
            set.push("achievements = ")
                .push_bind_unseparated(Json(achievements.clone()));
        }
        if let Some(quests) = &patch.quests {
            set.push("quests = ")
                .push_bind_unseparated(Json(quests.clone()));
        }
        set.push("updated_at = NOW()");
    }

    builder
        .push(" WHERE user_id = ")
        .push_bind(user_id)
        .push(" AND guild_id = ")
        .push_bind(guild_id)
        .push(format!(" RETURNING {COLUMNS}"));
    builder
}
