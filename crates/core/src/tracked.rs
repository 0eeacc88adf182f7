//! A profile paired with the sparse patch of its unpersisted changes.
//!
//! Every mutator writes the new value into the profile and mirrors the full
//! column value into the pending patch in the same call, so the two can never
//! diverge. Pipelines only ever mutate profiles through this type.

use crate::profile::{
    Achievements, Inventory, Profile, ProfilePatch, QuestStates, TempRoles, UserStats,
};
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedProfile {
    profile: Profile,
    pending: ProfilePatch,
    changes: u32,
}

impl TrackedProfile {
    /// Wrap a freshly loaded profile with no pending changes.
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            pending: ProfilePatch::default(),
            changes: 0,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn pending(&self) -> &ProfilePatch {
        &self.pending
    }

    /// True iff the pending patch names at least one column.
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of mutations recorded since the last successful flush.
    pub fn change_count(&self) -> u32 {
        self.changes
    }

    /// Replace the snapshot with the persisted row and forget the patch.
    pub fn mark_persisted(&mut self, persisted: Profile) {
        self.profile = persisted;
        self.pending = ProfilePatch::default();
        self.changes = 0;
    }

    fn touch(&mut self) {
        self.changes = self.changes.saturating_add(1);
    }

    // -- scalar columns ---------------------------------------------------

    pub fn set_xp(&mut self, xp: i64) {
        self.profile.xp = xp;
        self.pending.xp = Some(xp);
        self.touch();
    }

    /// Add `delta` XP (saturating) and return the new total.
    pub fn add_xp(&mut self, delta: i64) -> i64 {
        let xp = self.profile.xp.saturating_add(delta);
        self.set_xp(xp);
        xp
    }

    pub fn set_level(&mut self, level: i32) {
        self.profile.level = level;
        self.pending.level = Some(level);
        self.touch();
    }

    pub fn set_gold(&mut self, gold: i64) {
        self.profile.gold = gold;
        self.pending.gold = Some(gold);
        self.touch();
    }

    /// Add `delta` gold (saturating, may be negative) and return the new balance.
    pub fn add_gold(&mut self, delta: i64) -> i64 {
        let gold = self.profile.gold.saturating_add(delta);
        self.set_gold(gold);
        gold
    }

    pub fn set_streak_count(&mut self, streak: i32) {
        self.profile.streak_count = streak;
        self.pending.streak_count = Some(streak);
        self.touch();
    }

    pub fn set_last_daily_at(&mut self, at: Option<Timestamp>) {
        self.profile.last_daily_at = at;
        self.pending.last_daily_at = Some(at);
        self.touch();
    }

    pub fn set_last_message_at(&mut self, at: Option<Timestamp>) {
        self.profile.last_message_at = at;
        self.pending.last_message_at = Some(at);
        self.touch();
    }

    // -- JSON columns -----------------------------------------------------

    /// Add `by` to a `user_stats` counter and return the new value.
    pub fn increment_stat(&mut self, key: &str, by: i64) -> i64 {
        let mut value = 0;
        self.update_user_stats(|stats| {
            let counter = stats.entry(key.to_string()).or_insert(0);
            *counter = counter.saturating_add(by);
            value = *counter;
        });
        value
    }

    pub fn update_inventory<R>(&mut self, f: impl FnOnce(&mut Inventory) -> R) -> R {
        let out = f(&mut self.profile.inventory);
        self.pending.inventory = Some(self.profile.inventory.clone());
        self.touch();
        out
    }

    pub fn update_temp_roles<R>(&mut self, f: impl FnOnce(&mut TempRoles) -> R) -> R {
        let out = f(&mut self.profile.temp_roles);
        self.pending.temp_roles = Some(self.profile.temp_roles.clone());
        self.touch();
        out
    }

    pub fn update_user_stats<R>(&mut self, f: impl FnOnce(&mut UserStats) -> R) -> R {
        let out = f(&mut self.profile.user_stats);
        self.pending.user_stats = Some(self.profile.user_stats.clone());
        self.touch();
        out
    }

    pub fn update_achievements<R>(&mut self, f: impl FnOnce(&mut Achievements) -> R) -> R {
        let out = f(&mut self.profile.achievements);
        self.pending.achievements = Some(self.profile.achievements.clone());
        self.touch();
        out
    }

    pub fn update_quests<R>(&mut self, f: impl FnOnce(&mut QuestStates) -> R) -> R {
        let out = f(&mut self.profile.quests);
        self.pending.quests = Some(self.profile.quests.clone());
        self.touch();
        out
    }
}

impl From<Profile> for TrackedProfile {
    fn from(profile: Profile) -> Self {
        Self::new(profile)
    }
}
