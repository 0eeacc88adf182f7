//! Quest lifecycle: accept, progress, complete, claim, cool down.

use guildxp_core::catalog::{QuestCondition, QuestDef, QuestKind, Reward};
use guildxp_core::config::GuildConfig;
use guildxp_core::profile::{stats, QuestState, QuestStatus};
use guildxp_core::tracked::TrackedProfile;
use guildxp_core::types::{PlatformId, Timestamp};
use guildxp_events::bus::kinds;
use serde_json::json;

use crate::context::{later, ActivityContext};
use crate::effects::SideEffects;
use crate::rewards::apply_reward;
use crate::template;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestRefusal {
    #[error("No quest with id {0}")]
    UnknownQuest(String),
    #[error("Quest already in progress")]
    AlreadyActive,
    #[error("Quest completed, claim the reward first")]
    NeedsClaim,
    #[error("Quest on cooldown")]
    Cooldown { ready_at: Timestamp },
    #[error("Quest not completed yet")]
    NotCompleted,
}

impl QuestRefusal {
    pub fn reason(&self) -> &'static str {
        match self {
            QuestRefusal::UnknownQuest(_) => "unknown_quest",
            QuestRefusal::AlreadyActive => "already_active",
            QuestRefusal::NeedsClaim => "needs_claim",
            QuestRefusal::Cooldown { .. } => "cooldown",
            QuestRefusal::NotCompleted => "not_completed",
        }
    }
}

/// When a claimed quest can be accepted again.
pub fn ready_at(claimed_at: Timestamp, def: &QuestDef) -> Timestamp {
    let cooldown_ms = def.cooldown_seconds.max(0).saturating_mul(1000);
    later(claimed_at, chrono::Duration::try_milliseconds(cooldown_ms))
}

pub fn can_start(
    state: Option<&QuestState>,
    def: &QuestDef,
    now: Timestamp,
) -> Result<(), QuestRefusal> {
    let Some(state) = state else {
        return Ok(());
    };
    match state.status() {
        QuestStatus::Active => return Err(QuestRefusal::AlreadyActive),
        QuestStatus::Completed => return Err(QuestRefusal::NeedsClaim),
        QuestStatus::None | QuestStatus::Claimed => {}
    }
    if let Some(claimed_at) = state.claimed_at {
        let ready_at = ready_at(claimed_at, def);
        if now < ready_at {
            return Err(QuestRefusal::Cooldown { ready_at });
        }
    }
    Ok(())
}

/// Start `quest_id` with zero progress.
///
/// The cooldown was already checked by [`can_start`], so the previous
/// `claimed_at` is cleared along with the rest of the old instance.
pub fn accept(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    quest_id: &str,
    ctx: &ActivityContext,
) -> Result<SideEffects, QuestRefusal> {
    let def = config
        .quest(quest_id)
        .ok_or_else(|| QuestRefusal::UnknownQuest(quest_id.to_string()))?;
    can_start(tracked.profile().quests.get(quest_id), def, ctx.now)?;

    tracked.update_quests(|quests| {
        let state = quests.entry(quest_id.to_string()).or_default();
        state.accepted_at = Some(ctx.now);
        state.progress = 0;
        state.completed_at = None;
        state.claimed_at = None;
    });

    let mut effects = SideEffects::default();
    effects.record(ctx.event(kinds::QUEST_ACCEPTED, json!({ "questId": quest_id })));
    Ok(effects)
}

/// Activity that can advance quests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestEvent {
    Messages {
        channel_id: Option<PlatformId>,
        count: i64,
    },
    VcMinutes {
        channel_id: Option<PlatformId>,
        minutes: i64,
    },
    SpendGold {
        amount: i64,
    },
    EarnXp {
        amount: i64,
    },
    DailyClaim,
}

impl QuestEvent {
    pub fn kind(&self) -> QuestKind {
        match self {
            QuestEvent::Messages { .. } => QuestKind::Messages,
            QuestEvent::VcMinutes { .. } => QuestKind::VcMinutes,
            QuestEvent::SpendGold { .. } => QuestKind::SpendGold,
            QuestEvent::EarnXp { .. } => QuestKind::EarnXp,
            QuestEvent::DailyClaim => QuestKind::DailyClaim,
        }
    }

    /// Non-negative progress this event contributes to `condition`; 0 when
    /// the kinds differ or the channel is not allowed.
    ///
    /// Only channel-bound activity is gated by the allow-list.
    pub fn progress_for(&self, condition: &QuestCondition) -> i64 {
        if condition.kind != self.kind() {
            return 0;
        }
        let delta = match self {
            QuestEvent::Messages { channel_id, count } => {
                if !condition.allows_channel(channel_id.as_deref()) {
                    return 0;
                }
                *count
            }
            QuestEvent::VcMinutes {
                channel_id,
                minutes,
            } => {
                if !condition.allows_channel(channel_id.as_deref()) {
                    return 0;
                }
                *minutes
            }
            QuestEvent::SpendGold { amount } | QuestEvent::EarnXp { amount } => *amount,
            QuestEvent::DailyClaim => 1,
        };
        delta.max(0)
    }
}

/// Advance every active quest matching `event`. Several quests may complete
/// from one event; each completion queues its notification.
pub fn apply_event(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    event: &QuestEvent,
    ctx: &ActivityContext,
) -> SideEffects {
    let mut advanced = Vec::new();
    for (quest_id, state) in &tracked.profile().quests {
        if state.status() != QuestStatus::Active {
            continue;
        }
        let Some(def) = config.quest(quest_id) else {
            continue;
        };
        let delta = event.progress_for(&def.condition);
        if delta > 0 {
            advanced.push((def, delta));
        }
    }

    let mut effects = SideEffects::default();
    if advanced.is_empty() {
        return effects;
    }

    let completed: Vec<&QuestDef> = tracked.update_quests(|quests| {
        let mut completed = Vec::new();
        for (def, delta) in &advanced {
            let Some(state) = quests.get_mut(&def.id) else {
                continue;
            };
            state.progress = state.progress.saturating_add(*delta);
            if state.progress >= def.condition.target {
                state.completed_at = Some(ctx.now);
                completed.push(*def);
            }
        }
        completed
    });

    for def in completed {
        effects.record(ctx.event(
            kinds::QUEST_COMPLETED,
            json!({ "questId": def.id, "name": def.name }),
        ));
        let template = def
            .completion_message
            .as_deref()
            .unwrap_or(&config.messages.quest_completed);
        let channel = def
            .channel_id
            .as_ref()
            .or(config.announcements.quest_channel_id.as_ref());
        effects.send(
            ctx.target_channel(channel),
            template::render(
                template,
                &[("user", ctx.mention()), ("quest", def.name.clone())],
            ),
        );
    }
    effects
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestClaim {
    pub reward: Reward,
    pub effects: SideEffects,
}

/// Pay out a completed quest and reset its instance to `claimed`.
pub fn claim(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    quest_id: &str,
    ctx: &ActivityContext,
) -> Result<QuestClaim, QuestRefusal> {
    let def = config
        .quest(quest_id)
        .ok_or_else(|| QuestRefusal::UnknownQuest(quest_id.to_string()))?;
    let status = tracked
        .profile()
        .quests
        .get(quest_id)
        .map(QuestState::status);
    if status != Some(QuestStatus::Completed) {
        return Err(QuestRefusal::NotCompleted);
    }

    tracked.update_quests(|quests| {
        quests.insert(
            quest_id.to_string(),
            QuestState {
                accepted_at: None,
                progress: 0,
                completed_at: None,
                claimed_at: Some(ctx.now),
            },
        )
    });
    tracked.increment_stat(stats::QUESTS_CLAIMED, 1);

    let reward = &def.reward;
    let mut effects = apply_reward(tracked, reward, config, ctx, &format!("quest:{}", def.id));

    let vars = [
        ("user", ctx.mention()),
        ("quest", def.name.clone()),
        ("xp", reward.xp.to_string()),
        ("gold", reward.gold.to_string()),
    ];
    let template = reward
        .message
        .as_deref()
        .unwrap_or(&config.messages.quest_claimed);
    let channel = reward
        .channel_id
        .as_ref()
        .or(def.channel_id.as_ref())
        .or(config.announcements.quest_channel_id.as_ref());
    effects.send(ctx.target_channel(channel), template::render(template, &vars));
    effects.record(ctx.event(
        kinds::QUEST_CLAIMED,
        json!({ "questId": def.id, "xp": reward.xp, "gold": reward.gold }),
    ));

    Ok(QuestClaim {
        reward: reward.clone(),
        effects,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use guildxp_core::profile::Profile;

    use super::*;

    fn quest(id: &str, kind: QuestKind, target: i64, cooldown_seconds: i64) -> QuestDef {
        QuestDef {
            id: id.into(),
            name: format!("Quest {id}"),
            description: None,
            condition: QuestCondition {
                kind,
                target,
                channel_ids: Vec::new(),
            },
            cooldown_seconds,
            reward: Reward {
                xp: 50,
                gold: 10,
                ..Default::default()
            },
            completion_message: None,
            channel_id: None,
        }
    }

    fn config_with(quests: Vec<QuestDef>) -> GuildConfig {
        let mut config = GuildConfig::default();
        config.quests = quests;
        config
    }

    fn message(channel: &str) -> QuestEvent {
        QuestEvent::Messages {
            channel_id: Some(channel.into()),
            count: 1,
        }
    }

    #[test]
    fn third_message_completes_and_fourth_is_ignored() {
        let config = config_with(vec![quest("talk3", QuestKind::Messages, 3, 0)]);
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now()).in_channel("general");
        accept(&mut tracked, &config, "talk3", &ctx).unwrap();

        for n in 1..=2 {
            let effects = apply_event(&mut tracked, &config, &message("general"), &ctx);
            assert!(effects.is_empty());
            let state = &tracked.profile().quests["talk3"];
            assert_eq!(state.progress, n);
            assert!(state.completed_at.is_none());
        }

        let effects = apply_event(&mut tracked, &config, &message("general"), &ctx);
        assert_eq!(effects.event_types(), vec!["quest.completed"]);
        assert_eq!(effects.messages[0].channel_id, "general");
        assert_eq!(tracked.profile().quests["talk3"].completed_at, Some(ctx.now));

        let effects = apply_event(&mut tracked, &config, &message("general"), &ctx);
        assert!(effects.is_empty());
        assert_eq!(tracked.profile().quests["talk3"].progress, 3);
    }

    #[test]
    fn one_event_can_complete_several_quests() {
        let config = config_with(vec![
            quest("a", QuestKind::EarnXp, 10, 0),
            quest("b", QuestKind::EarnXp, 20, 0),
            quest("c", QuestKind::Messages, 1, 0),
        ]);
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now());
        for id in ["a", "b", "c"] {
            accept(&mut tracked, &config, id, &ctx).unwrap();
        }

        let effects = apply_event(&mut tracked, &config, &QuestEvent::EarnXp { amount: 25 }, &ctx);

        assert_eq!(effects.event_types(), vec!["quest.completed", "quest.completed"]);
        assert_eq!(tracked.profile().quests["c"].progress, 0);
    }

    #[test]
    fn channel_allow_list_gates_messages() {
        let mut def = quest("here", QuestKind::Messages, 1, 0);
        def.condition.channel_ids = vec!["quests".into()];
        let condition = def.condition.clone();

        assert_eq!(message("general").progress_for(&condition), 0);
        assert_eq!(message("quests").progress_for(&condition), 1);
        let nowhere = QuestEvent::Messages {
            channel_id: None,
            count: 1,
        };
        assert_eq!(nowhere.progress_for(&condition), 0);
        assert_eq!(QuestEvent::DailyClaim.progress_for(&condition), 0);
    }

    #[test]
    fn unaccepted_quests_do_not_progress() {
        let config = config_with(vec![quest("talk3", QuestKind::Messages, 3, 0)]);
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now());

        apply_event(&mut tracked, &config, &message("general"), &ctx);

        assert!(tracked.profile().quests.is_empty());
        assert!(!tracked.is_dirty());
    }

    #[test]
    fn claim_resets_instance_and_cooldown_is_exact() {
        let config = config_with(vec![quest("daily-chat", QuestKind::Messages, 1, 3600)]);
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now()).in_channel("general");
        accept(&mut tracked, &config, "daily-chat", &ctx).unwrap();
        apply_event(&mut tracked, &config, &message("general"), &ctx);

        let claim = claim(&mut tracked, &config, "daily-chat", &ctx).unwrap();

        assert_eq!(claim.reward.xp, 50);
        let state = &tracked.profile().quests["daily-chat"];
        assert_eq!(state.progress, 0);
        assert_eq!(state.accepted_at, None);
        assert_eq!(state.completed_at, None);
        assert_eq!(state.claimed_at, Some(ctx.now));
        assert_eq!(tracked.profile().stat(stats::QUESTS_CLAIMED), 1);
        assert_eq!((tracked.profile().xp, tracked.profile().gold), (50, 10));
        assert_eq!(
            claim.effects.messages.last().unwrap().content,
            "<@u> claimed **Quest daily-chat**: +50 XP, +10 gold."
        );

        let soon = ActivityContext::new("g", "u", ctx.now + Duration::seconds(10));
        assert_matches!(
            accept(&mut tracked, &config, "daily-chat", &soon),
            Err(QuestRefusal::Cooldown { ready_at }) if ready_at == ctx.now + Duration::seconds(3600)
        );
        let after = ActivityContext::new("g", "u", ctx.now + Duration::seconds(3600));
        assert!(accept(&mut tracked, &config, "daily-chat", &after).is_ok());
    }

    #[test]
    fn repeatable_quest_can_be_claimed_again_after_cooldown() {
        let config = config_with(vec![quest("chat", QuestKind::Messages, 1, 60)]);
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let first = ActivityContext::new("g", "u", Utc::now()).in_channel("general");
        accept(&mut tracked, &config, "chat", &first).unwrap();
        apply_event(&mut tracked, &config, &message("general"), &first);
        claim(&mut tracked, &config, "chat", &first).unwrap();

        let second = ActivityContext::new("g", "u", first.now + Duration::seconds(120))
            .in_channel("general");
        accept(&mut tracked, &config, "chat", &second).unwrap();
        assert_eq!(tracked.profile().quests["chat"].status(), QuestStatus::Active);
        apply_event(&mut tracked, &config, &message("general"), &second);
        assert_eq!(tracked.profile().quests["chat"].status(), QuestStatus::Completed);

        let refusal = accept(&mut tracked, &config, "chat", &second).unwrap_err();
        assert_eq!(refusal.reason(), "needs_claim");
        assert_eq!(tracked.profile().quests["chat"].progress, 1);

        let claimed = claim(&mut tracked, &config, "chat", &second).unwrap();
        assert_eq!(claimed.reward.xp, 50);
        assert_eq!(tracked.profile().quests["chat"].claimed_at, Some(second.now));
        assert_eq!(tracked.profile().stat(stats::QUESTS_CLAIMED), 2);
        assert_eq!((tracked.profile().xp, tracked.profile().gold), (100, 20));
    }

    #[test]
    fn zero_cooldown_is_immediately_restartable() {
        let config = config_with(vec![quest("again", QuestKind::DailyClaim, 1, 0)]);
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now());
        accept(&mut tracked, &config, "again", &ctx).unwrap();
        apply_event(&mut tracked, &config, &QuestEvent::DailyClaim, &ctx);
        claim(&mut tracked, &config, "again", &ctx).unwrap();

        assert!(accept(&mut tracked, &config, "again", &ctx).is_ok());
    }

    #[test]
    fn refusals_follow_the_lifecycle() {
        let config = config_with(vec![quest("q", QuestKind::Messages, 1, 0)]);
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now());

        assert_matches!(
            accept(&mut tracked, &config, "nope", &ctx),
            Err(QuestRefusal::UnknownQuest(_))
        );
        assert_matches!(
            claim(&mut tracked, &config, "q", &ctx),
            Err(QuestRefusal::NotCompleted)
        );
        accept(&mut tracked, &config, "q", &ctx).unwrap();
        let refusal = accept(&mut tracked, &config, "q", &ctx).unwrap_err();
        assert_eq!(refusal.reason(), "already_active");

        apply_event(&mut tracked, &config, &message("c"), &ctx);
        let refusal = accept(&mut tracked, &config, "q", &ctx).unwrap_err();
        assert_eq!(refusal.reason(), "needs_claim");
    }
}
