//! In-memory [`StoreBackend`] for tests.
//!
//! Records every profile write so callers can assert how many statements a
//! flush would have issued and which columns each one covered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use guildxp_core::profile::{Profile, ProfilePatch};
use guildxp_core::types::DbId;
use guildxp_db::models::guild::Guild;

use crate::backend::StoreBackend;
use crate::error::CacheError;
use crate::profile::ProfileKey;

#[derive(Default)]
struct State {
    next_id: DbId,
    guilds: HashMap<String, Guild>,
    users: HashMap<String, DbId>,
    profiles: HashMap<ProfileKey, Profile>,
    writes: Vec<(ProfileKey, Vec<&'static str>)>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    profile_loads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a pool timeout.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of profile loads that reached the backend.
    pub fn profile_loads(&self) -> usize {
        self.profile_loads.load(Ordering::SeqCst)
    }

    /// Column lists of every profile write, in order.
    pub fn profile_writes(&self) -> Vec<Vec<&'static str>> {
        self.lock().writes.iter().map(|(_, cols)| cols.clone()).collect()
    }

    pub fn stored_profile(&self, key: ProfileKey) -> Option<Profile> {
        self.lock().profiles.get(&key).cloned()
    }

    /// Store a config document for a guild, creating the guild if needed.
    pub fn seed_guild_config(&self, discord_guild_id: &str, config: serde_json::Value) {
        let mut state = self.lock();
        let id = match state.guilds.get(discord_guild_id) {
            Some(guild) => guild.id,
            None => state.next_id(),
        };
        let now = Utc::now();
        state.guilds.insert(
            discord_guild_id.to_string(),
            Guild {
                id,
                discord_guild_id: discord_guild_id.to_string(),
                config,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn guild_config(&self, discord_guild_id: &str) -> Option<serde_json::Value> {
        self.lock()
            .guilds
            .get(discord_guild_id)
            .map(|g| g.config.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn upsert_guild(&self, discord_guild_id: &str) -> Result<Guild, CacheError> {
        if let Some(guild) = self.lock().guilds.get(discord_guild_id) {
            return Ok(guild.clone());
        }
        self.seed_guild_config(discord_guild_id, serde_json::json!({}));
        self.lock()
            .guilds
            .get(discord_guild_id)
            .cloned()
            .ok_or_else(|| CacheError::not_found("guild", discord_guild_id))
    }

    async fn upsert_user(&self, discord_user_id: &str) -> Result<DbId, CacheError> {
        let mut state = self.lock();
        if let Some(id) = state.users.get(discord_user_id) {
            return Ok(*id);
        }
        let id = state.next_id();
        state.users.insert(discord_user_id.to_string(), id);
        Ok(id)
    }

    async fn load_profile(&self, key: ProfileKey) -> Result<Profile, CacheError> {
        self.profile_loads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        Ok(state
            .profiles
            .entry(key)
            .or_insert_with(|| Profile::new(key.user_id, key.guild_id))
            .clone())
    }

    async fn write_profile(
        &self,
        key: ProfileKey,
        patch: &ProfilePatch,
    ) -> Result<Profile, CacheError> {
        self.check_writable()?;
        let mut state = self.lock();
        let mut profile = state
            .profiles
            .get(&key)
            .cloned()
            .ok_or_else(|| CacheError::not_found("profile", key))?;
        patch.apply_to(&mut profile);
        state.profiles.insert(key, profile.clone());
        state.writes.push((key, patch.columns()));
        Ok(profile)
    }

    async fn write_guild_config(
        &self,
        guild_id: DbId,
        config: &serde_json::Value,
    ) -> Result<(), CacheError> {
        self.check_writable()?;
        let mut state = self.lock();
        let guild = state
            .guilds
            .values_mut()
            .find(|g| g.id == guild_id)
            .ok_or_else(|| CacheError::not_found("guild", guild_id))?;
        guild.config = config.clone();
        guild.updated_at = Utc::now();
        Ok(())
    }

    /// Unhealthy while writes are set to fail.
    async fn ping(&self) -> Result<(), CacheError> {
        self.check_writable()
    }
}
