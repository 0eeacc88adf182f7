//! Achievement, quest and reward catalog types.
//!
//! Admin-supplied condition and reward payloads arrive as free-form JSON.
//! They are parsed into closed tagged unions here, at config-write time, so
//! the reward pipelines never deal with unknown shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{PlatformId, Timestamp};

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

/// What a member receives for an achievement unlock or a quest claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reward {
    pub xp: i64,
    pub gold: i64,
    /// Shop item id granted once. Skipped if the item left the catalog.
    pub item_id: Option<String>,
    pub role_id: Option<PlatformId>,
    /// Announcement template; see the pipeline template placeholders.
    pub message: Option<String>,
    /// Overrides the default announcement channel.
    pub channel_id: Option<PlatformId>,
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

/// Relational operator used by achievement conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "==", alias = "eq")]
    Eq,
    #[serde(rename = "!=", alias = "ne")]
    Ne,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = ">=", alias = "gte")]
    Gte,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = "<=", alias = "lte")]
    Lte,
}

impl Comparison {
    pub fn holds(self, current: i64, threshold: i64) -> bool {
        match self {
            Comparison::Eq => current == threshold,
            Comparison::Ne => current != threshold,
            Comparison::Gt => current > threshold,
            Comparison::Gte => current >= threshold,
            Comparison::Lt => current < threshold,
            Comparison::Lte => current <= threshold,
        }
    }
}

/// Where an achievement reads its scalar "current value" from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum ValueSource {
    /// A `user_stats` counter; missing counters read as 0.
    Stat { key: String },
    Level,
    Xp,
    Gold,
    Streak,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementCondition {
    #[serde(flatten)]
    pub source: ValueSource,
    pub operator: Comparison,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub condition: AchievementCondition,
    #[serde(default)]
    pub reward: Option<Reward>,
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// Activity kind a quest counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestKind {
    Messages,
    VcMinutes,
    SpendGold,
    EarnXp,
    DailyClaim,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestCondition {
    #[serde(rename = "type")]
    pub kind: QuestKind,
    pub target: i64,
    /// Optional allow-list; empty means any channel counts.
    #[serde(default)]
    pub channel_ids: Vec<PlatformId>,
}

impl QuestCondition {
    pub fn allows_channel(&self, channel_id: Option<&str>) -> bool {
        if self.channel_ids.is_empty() {
            return true;
        }
        channel_id.is_some_and(|id| self.channel_ids.iter().any(|c| c == id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "conditions")]
    pub condition: QuestCondition,
    /// Seconds after a claim before the quest can be accepted again.
    #[serde(default)]
    pub cooldown_seconds: i64,
    #[serde(default)]
    pub reward: Reward,
    /// Completion notification template; falls back to the guild default.
    #[serde(default)]
    pub completion_message: Option<String>,
    #[serde(default)]
    pub channel_id: Option<PlatformId>,
}

// ---------------------------------------------------------------------------
// Shop and temp roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub name: String,
    pub price: i64,
    #[serde(default)]
    pub description: Option<String>,
    /// Role granted on purchase.
    #[serde(default)]
    pub role_id: Option<PlatformId>,
}

/// Expiry policy for a role granted temporarily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempRoleConfig {
    pub default_duration_minutes: i64,
    /// Absolute deadline; the computed expiry never passes it.
    #[serde(default)]
    pub hard_expiry_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Free-form payload parsing
// ---------------------------------------------------------------------------

fn parse_payload<T: serde::de::DeserializeOwned>(raw: &Value, what: &str) -> Result<T, CoreError> {
    T::deserialize(raw).map_err(|e| CoreError::Validation(format!("Invalid {what}: {e}")))
}

/// Parse an admin-supplied achievement condition.
pub fn parse_achievement_condition(raw: &Value) -> Result<AchievementCondition, CoreError> {
    let condition: AchievementCondition = parse_payload(raw, "achievement condition")?;
    if let ValueSource::Stat { key } = &condition.source {
        if key.trim().is_empty() {
            return Err(CoreError::Validation(
                "Stat conditions need a non-empty key".to_string(),
            ));
        }
    }
    Ok(condition)
}

/// Parse an admin-supplied quest condition.
pub fn parse_quest_condition(raw: &Value) -> Result<QuestCondition, CoreError> {
    let condition: QuestCondition = parse_payload(raw, "quest condition")?;
    if condition.target <= 0 {
        return Err(CoreError::Validation(
            "Quest target must be greater than zero".to_string(),
        ));
    }
    Ok(condition)
}

/// Parse an admin-supplied reward.
pub fn parse_reward(raw: &Value) -> Result<Reward, CoreError> {
    let reward: Reward = parse_payload(raw, "reward")?;
    if reward.xp < 0 || reward.gold < 0 {
        return Err(CoreError::Validation(
            "Reward xp and gold must not be negative".to_string(),
        ));
    }
    if reward.item_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
        return Err(CoreError::Validation(
            "Reward references an empty item id".to_string(),
        ));
    }
    Ok(reward)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn comparison_operators() {
        assert!(Comparison::Gte.holds(5, 5));
        assert!(!Comparison::Gt.holds(5, 5));
        assert!(Comparison::Lt.holds(4, 5));
        assert!(Comparison::Lte.holds(5, 5));
        assert!(Comparison::Ne.holds(4, 5));
        assert!(Comparison::Eq.holds(5, 5));
    }

    #[test]
    fn parses_stat_condition_with_symbol_operator() {
        let c = parse_achievement_condition(
            &json!({"source": "stat", "key": "messages", "operator": ">=", "threshold": 100}),
        )
        .unwrap();
        assert_eq!(
            c.source,
            ValueSource::Stat {
                key: "messages".into()
            }
        );
        assert_eq!(c.operator, Comparison::Gte);
        assert_eq!(c.threshold, 100);
    }

    #[test]
    fn parses_level_condition_with_word_operator() {
        let c = parse_achievement_condition(
            &json!({"source": "level", "operator": "gt", "threshold": 9}),
        )
        .unwrap();
        assert_eq!(c.source, ValueSource::Level);
        assert_eq!(c.operator, Comparison::Gt);
    }

    #[test]
    fn rejects_non_object_condition() {
        let err = parse_achievement_condition(&json!("messages >= 100")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_source() {
        let err = parse_achievement_condition(
            &json!({"source": "karma", "operator": ">", "threshold": 1}),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn parses_quest_condition() {
        let c = parse_quest_condition(
            &json!({"type": "vcMinutes", "target": 30, "channelIds": ["7"]}),
        )
        .unwrap();
        assert_eq!(c.kind, QuestKind::VcMinutes);
        assert!(c.allows_channel(Some("7")));
        assert!(!c.allows_channel(Some("8")));
        assert!(!c.allows_channel(None));
    }

    #[test]
    fn rejects_non_positive_quest_target() {
        assert!(parse_quest_condition(&json!({"type": "messages", "target": 0})).is_err());
    }

    #[test]
    fn unrestricted_condition_allows_any_channel() {
        let c = parse_quest_condition(&json!({"type": "messages", "target": 3})).unwrap();
        assert!(c.allows_channel(None));
        assert!(c.allows_channel(Some("1")));
    }

    #[test]
    fn rejects_negative_reward() {
        assert!(parse_reward(&json!({"xp": -5})).is_err());
        assert!(parse_reward(&json!({"itemId": " "})).is_err());
        let reward = parse_reward(&json!({"gold": 10, "roleId": "99"})).unwrap();
        assert_eq!(reward.gold, 10);
        assert_eq!(reward.role_id.as_deref(), Some("99"));
    }
}
