//! Per-(guild, user) profile model and its sparse change patch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, PlatformId, Timestamp};

// ---------------------------------------------------------------------------
// JSON column contents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub item_id: String,
    pub name: String,
    pub quantity: i64,
    pub acquired_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempRoleGrant {
    pub expires_at: Timestamp,
    /// What granted the role, e.g. `"shop:vip-pass"`.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlock {
    pub unlocked_at: Timestamp,
}

/// Lifecycle of one quest instance: none → active → completed → claimed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestState {
    pub accepted_at: Option<Timestamp>,
    pub progress: i64,
    pub completed_at: Option<Timestamp>,
    pub claimed_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestStatus {
    None,
    Active,
    Completed,
    Claimed,
}

impl QuestState {
    /// Claiming clears `completed_at`, so a set `completed_at` always
    /// belongs to the current instance even if an older `claimed_at` is
    /// still present.
    pub fn status(&self) -> QuestStatus {
        match (self.accepted_at, self.completed_at, self.claimed_at) {
            (_, Some(_), _) => QuestStatus::Completed,
            (Some(_), None, _) => QuestStatus::Active,
            (None, None, Some(_)) => QuestStatus::Claimed,
            (None, None, None) => QuestStatus::None,
        }
    }
}

pub type Inventory = BTreeMap<String, InventoryItem>;
/// Keyed by role id.
pub type TempRoles = BTreeMap<PlatformId, TempRoleGrant>;
/// Append-only counters keyed by stat name.
pub type UserStats = BTreeMap<String, i64>;
/// Keyed by achievement id; write-once per id.
pub type Achievements = BTreeMap<String, AchievementUnlock>;
/// Keyed by quest id.
pub type QuestStates = BTreeMap<String, QuestState>;

/// Well-known `user_stats` counter names.
pub mod stats {
    pub const MESSAGES: &str = "messages";
    pub const VOICE_MINUTES: &str = "voiceMinutes";
    pub const GOLD_SPENT: &str = "goldSpent";
    pub const DAILY_CLAIMS: &str = "dailyClaims";
    pub const QUESTS_CLAIMED: &str = "questsClaimed";
    pub const ACHIEVEMENTS_UNLOCKED: &str = "achievementsUnlocked";
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Authoritative snapshot of a `user_guild_profiles` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: DbId,
    pub guild_id: DbId,
    /// Non-decreasing except for admin overrides.
    pub xp: i64,
    /// Derived from `xp` through the guild curve, stored redundantly.
    pub level: i32,
    pub gold: i64,
    pub streak_count: i32,
    pub last_daily_at: Option<Timestamp>,
    pub last_message_at: Option<Timestamp>,
    pub inventory: Inventory,
    pub temp_roles: TempRoles,
    pub user_stats: UserStats,
    pub achievements: Achievements,
    pub quests: QuestStates,
}

impl Profile {
    /// A fresh row as created by the first upsert.
    pub fn new(user_id: DbId, guild_id: DbId) -> Self {
        Self {
            user_id,
            guild_id,
            xp: 0,
            level: 0,
            gold: 0,
            streak_count: 0,
            last_daily_at: None,
            last_message_at: None,
            inventory: Inventory::new(),
            temp_roles: TempRoles::new(),
            user_stats: UserStats::new(),
            achievements: Achievements::new(),
            quests: QuestStates::new(),
        }
    }

    pub fn stat(&self, key: &str) -> i64 {
        self.user_stats.get(key).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// ProfilePatch
// ---------------------------------------------------------------------------

/// Sparse patch of profile columns changed since the last flush.
///
/// JSON-valued columns carry their full replacement value, never a diff.
/// A patch is transient: only the columns it names reach the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub xp: Option<i64>,
    pub level: Option<i32>,
    pub gold: Option<i64>,
    pub streak_count: Option<i32>,
    pub last_daily_at: Option<Option<Timestamp>>,
    pub last_message_at: Option<Option<Timestamp>>,
    pub inventory: Option<Inventory>,
    pub temp_roles: Option<TempRoles>,
    pub user_stats: Option<UserStats>,
    pub achievements: Option<Achievements>,
    pub quests: Option<QuestStates>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.columns().is_empty()
    }

    /// Database column names covered by this patch, in table order.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = Vec::new();
        if self.xp.is_some() {
            columns.push("xp");
        }
        if self.level.is_some() {
            columns.push("level");
        }
        if self.gold.is_some() {
            columns.push("gold");
        }
        if self.streak_count.is_some() {
            columns.push("streak_count");
        }
        if self.last_daily_at.is_some() {
            columns.push("last_daily_at");
        }
        if self.last_message_at.is_some() {
            columns.push("last_message_at");
        }
        if self.inventory.is_some() {
            columns.push("inventory");
        }
        if self.temp_roles.is_some() {
            columns.push("temp_roles");
        }
        if self.user_stats.is_some() {
            columns.push("user_stats");
        }
        if self.achievements.is_some() {
            columns.push("achievements");
        }
        if self.quests.is_some() {
            columns.push("quests");
        }
        columns
    }

    /// Layer `later` over this patch; fields set in `later` win.
    pub fn merge(&mut self, later: ProfilePatch) {
        if later.xp.is_some() {
            self.xp = later.xp;
        }
        if later.level.is_some() {
            self.level = later.level;
        }
        if later.gold.is_some() {
            self.gold = later.gold;
        }
        if later.streak_count.is_some() {
            self.streak_count = later.streak_count;
        }
        if later.last_daily_at.is_some() {
            self.last_daily_at = later.last_daily_at;
        }
        if later.last_message_at.is_some() {
            self.last_message_at = later.last_message_at;
        }
        if later.inventory.is_some() {
            self.inventory = later.inventory;
        }
        if later.temp_roles.is_some() {
            self.temp_roles = later.temp_roles;
        }
        if later.user_stats.is_some() {
            self.user_stats = later.user_stats;
        }
        if later.achievements.is_some() {
            self.achievements = later.achievements;
        }
        if later.quests.is_some() {
            self.quests = later.quests;
        }
    }

    /// Apply the patched columns to `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(v) = self.xp {
            profile.xp = v;
        }
        if let Some(v) = self.level {
            profile.level = v;
        }
        if let Some(v) = self.gold {
            profile.gold = v;
        }
        if let Some(v) = self.streak_count {
            profile.streak_count = v;
        }
        if let Some(v) = self.last_daily_at {
            profile.last_daily_at = v;
        }
        if let Some(v) = self.last_message_at {
            profile.last_message_at = v;
        }
        if let Some(v) = &self.inventory {
            profile.inventory = v.clone();
        }
        if let Some(v) = &self.temp_roles {
            profile.temp_roles = v.clone();
        }
        if let Some(v) = &self.user_stats {
            profile.user_stats = v.clone();
        }
        if let Some(v) = &self.achievements {
            profile.achievements = v.clone();
        }
        if let Some(v) = &self.quests {
            profile.quests = v.clone();
        }
    }
}
