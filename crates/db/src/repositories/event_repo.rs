//! Repository for the append-only `events` table.

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::event::{CreateEvent, Event};

/// Column list for `events` queries.
const COLUMNS: &str =
    "id, event_type, discord_guild_id, discord_user_id, payload, created_at";

/// Postgres caps bind parameters at 65535; five per row keeps well clear.
const MAX_ROWS_PER_INSERT: usize = 1000;

/// Provides write and read operations for audit events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a batch of events, returning the number of rows written.
    pub async fn insert_batch(pool: &PgPool, events: &[CreateEvent]) -> Result<u64, sqlx::Error> {
        let mut written = 0;
        for chunk in events.chunks(MAX_ROWS_PER_INSERT) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO events \
                    (event_type, discord_guild_id, discord_user_id, payload, created_at) ",
            );
            builder.push_values(chunk, |mut row, event| {
                row.push_bind(&event.event_type)
                    .push_bind(&event.discord_guild_id)
                    .push_bind(&event.discord_user_id)
                    .push_bind(&event.payload)
                    .push_bind(event.created_at);
            });
            written += builder.build().execute(pool).await?.rows_affected();
        }
        Ok(written)
    }

    /// List a guild's most recent events, newest first.
    pub async fn list_recent_for_guild(
        pool: &PgPool,
        discord_guild_id: &str,
        limit: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events
             WHERE discord_guild_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(discord_guild_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
