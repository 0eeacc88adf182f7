//! Per-guild configuration.
//!
//! The stored document is sparse: every read deep-merges it over
//! [`GuildConfig::default`] so new settings get sensible values without a
//! migration. Writes go through [`GuildConfig::apply_patch`], which validates
//! the merged result and rejects it before anything is persisted.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{
    parse_achievement_condition, parse_quest_condition, parse_reward, AchievementDef, QuestDef,
    ShopItem, TempRoleConfig,
};
use crate::error::CoreError;
use crate::leveling::LevelingConfig;
use crate::merge::deep_merge;
use crate::types::PlatformId;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// XP rates for passive activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XpConfig {
    pub message_xp_min: i64,
    pub message_xp_max: i64,
    pub message_cooldown_seconds: i64,
    pub voice_xp_per_minute: i64,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            message_xp_min: 15,
            message_xp_max: 25,
            message_cooldown_seconds: 60,
            voice_xp_per_minute: 5,
        }
    }
}

/// Daily reward and streak settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyConfig {
    pub xp: i64,
    pub gold: i64,
    /// Bonus per extra streak day: factor is `1 + multiplier * (streak - 1)`.
    pub streak_multiplier: f64,
    pub cooldown_hours: i64,
    /// A claim later than this after the previous one resets the streak.
    pub streak_window_hours: i64,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            xp: 100,
            gold: 50,
            streak_multiplier: 0.1,
            cooldown_hours: 24,
            streak_window_hours: 48,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnouncementConfig {
    pub level_up_channel_id: Option<PlatformId>,
    pub achievement_channel_id: Option<PlatformId>,
    pub quest_channel_id: Option<PlatformId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShopConfig {
    pub items: BTreeMap<String, ShopItem>,
}

/// Routing of audit events to a guild log channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub channel_id: Option<PlatformId>,
    /// Event types (e.g. `"level.up"`) broadcast to the channel.
    pub events: Vec<String>,
}

impl LoggingConfig {
    /// Channel to broadcast `event_type` to, if routing is enabled for it.
    pub fn route(&self, event_type: &str) -> Option<&str> {
        let channel = self.channel_id.as_deref()?;
        self.events
            .iter()
            .any(|e| e == event_type || e == "*")
            .then_some(channel)
    }
}

/// Presentation strings. See the pipeline template placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageTemplates {
    pub level_up: String,
    pub achievement_unlocked: String,
    pub quest_completed: String,
    pub quest_claimed: String,
    pub daily_claimed: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            level_up: "{user} reached level **{level}**!".to_string(),
            achievement_unlocked: "{user} unlocked the achievement **{achievement}**!"
                .to_string(),
            quest_completed: "{user} completed the quest **{quest}**! Claim your reward."
                .to_string(),
            quest_claimed: "{user} claimed **{quest}**: +{xp} XP, +{gold} gold.".to_string(),
            daily_claimed: "{user} claimed their daily: +{xp} XP, +{gold} gold (streak {streak})."
                .to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// GuildConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuildConfig {
    pub xp: XpConfig,
    pub leveling: LevelingConfig,
    /// Role granted on reaching a level.
    pub level_roles: BTreeMap<u32, PlatformId>,
    pub announcements: AnnouncementConfig,
    pub daily: DailyConfig,
    pub shop: ShopConfig,
    pub achievements: Vec<AchievementDef>,
    pub quests: Vec<QuestDef>,
    /// Keyed by role id.
    pub temp_roles: BTreeMap<PlatformId, TempRoleConfig>,
    pub logging: LoggingConfig,
    pub messages: MessageTemplates,
}

impl GuildConfig {
    /// Resolve a stored (possibly sparse) document against the defaults.
    pub fn from_stored(stored: &Value) -> Result<Self, CoreError> {
        let mut merged = serde_json::to_value(Self::default())
            .map_err(|e| CoreError::Internal(format!("Failed to encode defaults: {e}")))?;
        if !stored.is_null() {
            deep_merge(&mut merged, stored.clone());
        }
        serde_json::from_value(merged)
            .map_err(|e| CoreError::Validation(format!("Invalid guild config: {e}")))
    }

    /// Merge an admin patch over the stored document and validate it.
    ///
    /// Returns the new stored document together with the resolved config.
    /// On error nothing is returned, so the caller keeps the stored config
    /// unmodified.
    pub fn apply_patch(stored: &Value, patch: Value) -> Result<(Value, Self), CoreError> {
        if !patch.is_object() {
            return Err(CoreError::Validation(
                "Config patch must be a JSON object".to_string(),
            ));
        }
        let mut document = if stored.is_object() {
            stored.clone()
        } else {
            Value::Object(Default::default())
        };
        deep_merge(&mut document, patch);
        check_catalog_payloads(&document)?;
        let config = Self::from_stored(&document)?;
        config.validate()?;
        Ok((document, config))
    }

    pub fn quest(&self, quest_id: &str) -> Option<&QuestDef> {
        self.quests.iter().find(|q| q.id == quest_id)
    }

    /// Check invariants that deserialization alone cannot express.
    pub fn validate(&self) -> Result<(), CoreError> {
        let xp = &self.xp;
        if xp.message_xp_min < 0 || xp.message_xp_max < xp.message_xp_min {
            return Err(CoreError::Validation(
                "Message XP range must satisfy 0 <= min <= max".to_string(),
            ));
        }
        if xp.message_cooldown_seconds < 0 || xp.voice_xp_per_minute < 0 {
            return Err(CoreError::Validation(
                "XP cooldown and voice rate must not be negative".to_string(),
            ));
        }

        let daily = &self.daily;
        if daily.xp < 0 || daily.gold < 0 || daily.streak_multiplier < 0.0 {
            return Err(CoreError::Validation(
                "Daily rewards and streak multiplier must not be negative".to_string(),
            ));
        }
        if daily.cooldown_hours <= 0 || daily.streak_window_hours < daily.cooldown_hours {
            return Err(CoreError::Validation(
                "Daily streak window must be at least the cooldown".to_string(),
            ));
        }

        self.leveling.validate()?;

        for (id, item) in &self.shop.items {
            if id.trim().is_empty() || item.price < 0 {
                return Err(CoreError::Validation(format!(
                    "Shop item '{id}' needs a non-empty id and a non-negative price"
                )));
            }
        }

        for (role_id, temp) in &self.temp_roles {
            if temp.default_duration_minutes <= 0 {
                return Err(CoreError::Validation(format!(
                    "Temp role '{role_id}' needs a positive duration"
                )));
            }
        }

        let mut seen = HashSet::new();
        for achievement in &self.achievements {
            if achievement.id.trim().is_empty() || !seen.insert(achievement.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Achievement id '{}' is empty or duplicated",
                    achievement.id
                )));
            }
        }

        let mut seen = HashSet::new();
        for quest in &self.quests {
            if quest.id.trim().is_empty() || !seen.insert(quest.id.as_str()) {
                return Err(CoreError::Validation(format!(
                    "Quest id '{}' is empty or duplicated",
                    quest.id
                )));
            }
            if quest.cooldown_seconds < 0 {
                return Err(CoreError::Validation(format!(
                    "Quest '{}' needs a non-negative cooldown",
                    quest.id
                )));
            }
        }

        Ok(())
    }
}

/// Run each catalog entry's free-form condition and reward through the
/// typed parsers, naming the offending entry on failure.
fn check_catalog_payloads(document: &Value) -> Result<(), CoreError> {
    let named = |entry: &Value, e: CoreError| match e {
        CoreError::Validation(msg) => {
            let id = entry.get("id").and_then(Value::as_str).unwrap_or("?");
            CoreError::Validation(format!("'{id}': {msg}"))
        }
        other => other,
    };

    for entry in catalog(document, "achievements") {
        let condition = entry.get("condition").unwrap_or(&Value::Null);
        parse_achievement_condition(condition).map_err(|e| named(entry, e))?;
        if let Some(reward) = entry.get("reward").filter(|r| !r.is_null()) {
            parse_reward(reward).map_err(|e| named(entry, e))?;
        }
    }
    for entry in catalog(document, "quests") {
        let condition = entry.get("conditions").unwrap_or(&Value::Null);
        parse_quest_condition(condition).map_err(|e| named(entry, e))?;
        if let Some(reward) = entry.get("reward").filter(|r| !r.is_null()) {
            parse_reward(reward).map_err(|e| named(entry, e))?;
        }
    }
    Ok(())
}

fn catalog<'a>(document: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    document
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
