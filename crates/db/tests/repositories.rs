//! Integration tests for the repository layer.
//!
//! These run against a real database through `#[sqlx::test]` and are
//! ignored by default; run them with `cargo test -- --ignored` and a
//! `DATABASE_URL` pointing at a scratch Postgres.

use chrono::Utc;
use guildxp_core::profile::{ProfilePatch, QuestState, QuestStates};
use guildxp_db::models::event::CreateEvent;
use guildxp_db::repositories::{EventRepo, GuildRepo, ProfileRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Test: upserts are idempotent
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_upserts_return_existing_rows(pool: PgPool) {
    let first = UserRepo::upsert(&pool, "1001").await.unwrap();
    let second = UserRepo::upsert(&pool, "1001").await.unwrap();
    assert_eq!(first.id, second.id);

    let guild = GuildRepo::upsert(&pool, "9001").await.unwrap();
    let again = GuildRepo::upsert(&pool, "9001").await.unwrap();
    assert_eq!(guild.id, again.id);
    assert_eq!(guild.config, serde_json::json!({}));
}

// ---------------------------------------------------------------------------
// Test: profile create + coalesced patch
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_profile_patch_updates_only_named_columns(pool: PgPool) {
    let user = UserRepo::upsert(&pool, "1002").await.unwrap();
    let guild = GuildRepo::upsert(&pool, "9002").await.unwrap();

    let row = ProfileRepo::get_or_create(&pool, user.id, guild.id)
        .await
        .unwrap()
        .expect("profile row should exist after upsert");
    assert_eq!(row.xp, 0);
    assert!(row.quests.0.is_empty());

    let mut quests = QuestStates::new();
    quests.insert(
        "talk3".into(),
        QuestState {
            accepted_at: Some(Utc::now()),
            progress: 2,
            ..Default::default()
        },
    );
    let patch = ProfilePatch {
        xp: Some(100),
        gold: Some(50),
        quests: Some(quests),
        ..Default::default()
    };
    let updated = ProfileRepo::apply_patch(&pool, user.id, guild.id, &patch)
        .await
        .unwrap()
        .expect("patched row");
    assert_eq!(updated.xp, 100);
    assert_eq!(updated.gold, 50);
    assert_eq!(updated.level, 0);
    assert_eq!(updated.quests.0["talk3"].progress, 2);
}

// ---------------------------------------------------------------------------
// Test: config replacement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_update_config_replaces_document(pool: PgPool) {
    let guild = GuildRepo::upsert(&pool, "9003").await.unwrap();
    let doc = serde_json::json!({"xp": {"voiceXpPerMinute": 9}});
    let updated = GuildRepo::update_config(&pool, guild.id, &doc)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.config, doc);

    let missing = GuildRepo::update_config(&pool, guild.id + 1000, &doc)
        .await
        .unwrap();
    assert!(missing.is_none());
}

// ---------------------------------------------------------------------------
// Test: batched audit insert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_insert_batch_writes_every_event(pool: PgPool) {
    let events: Vec<CreateEvent> = (0..3)
        .map(|i| CreateEvent {
            event_type: "xp.granted".into(),
            discord_guild_id: Some("9004".into()),
            discord_user_id: Some(format!("{i}")),
            payload: serde_json::json!({"amount": i}),
            created_at: Utc::now(),
        })
        .collect();
    let written = EventRepo::insert_batch(&pool, &events).await.unwrap();
    assert_eq!(written, 3);

    let recent = EventRepo::list_recent_for_guild(&pool, "9004", 10)
        .await
        .unwrap();
    assert_eq!(recent.len(), 3);
}
