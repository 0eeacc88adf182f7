//! Repository for the `users` table.

use sqlx::PgPool;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, discord_user_id, created_at";

/// Provides identity lookups for platform users.
pub struct UserRepo;

impl UserRepo {
    /// Insert the user if it is new, returning the (possibly existing) row.
    pub async fn upsert(pool: &PgPool, discord_user_id: &str) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (discord_user_id)
             VALUES ($1)
             ON CONFLICT (discord_user_id) DO UPDATE SET
                discord_user_id = EXCLUDED.discord_user_id
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(discord_user_id)
            .fetch_one(pool)
            .await
    }
}
