//! One-way achievement unlocks.
//!
//! An achievement id is either absent from `profile.achievements` (locked) or
//! present with its unlock time (unlocked, terminal). Evaluation only ever
//! looks at locked ids, so an unlock can never fire twice.

use guildxp_core::catalog::{AchievementDef, ValueSource};
use guildxp_core::config::GuildConfig;
use guildxp_core::profile::{stats, AchievementUnlock, Profile};
use guildxp_core::tracked::TrackedProfile;
use guildxp_events::bus::kinds;
use serde_json::json;

use crate::context::ActivityContext;
use crate::effects::SideEffects;
use crate::rewards::apply_reward;
use crate::template;

/// The scalar an achievement condition compares against.
pub fn current_value(source: &ValueSource, profile: &Profile) -> i64 {
    match source {
        ValueSource::Stat { key } => profile.stat(key),
        ValueSource::Level => i64::from(profile.level),
        ValueSource::Xp => profile.xp,
        ValueSource::Gold => profile.gold,
        ValueSource::Streak => i64::from(profile.streak_count),
    }
}

/// Locked achievements whose condition now holds, in catalog order.
pub fn evaluate<'a>(profile: &Profile, config: &'a GuildConfig) -> Vec<&'a AchievementDef> {
    config
        .achievements
        .iter()
        .filter(|def| !profile.achievements.contains_key(&def.id))
        .filter(|def| {
            let condition = &def.condition;
            condition
                .operator
                .holds(current_value(&condition.source, profile), condition.threshold)
        })
        .collect()
}

/// Record the unlocks and apply their rewards.
pub fn apply_unlocks(
    tracked: &mut TrackedProfile,
    unlocked: &[&AchievementDef],
    config: &GuildConfig,
    ctx: &ActivityContext,
) -> SideEffects {
    let mut effects = SideEffects::default();
    let channel = ctx.target_channel(config.announcements.achievement_channel_id.as_ref());

    for def in unlocked {
        if tracked.profile().achievements.contains_key(&def.id) {
            continue;
        }
        tracked.update_achievements(|achievements| {
            achievements.insert(
                def.id.clone(),
                AchievementUnlock {
                    unlocked_at: ctx.now,
                },
            )
        });
        tracked.increment_stat(stats::ACHIEVEMENTS_UNLOCKED, 1);

        effects.record(ctx.event(
            kinds::ACHIEVEMENT_UNLOCKED,
            json!({ "achievementId": def.id, "name": def.name }),
        ));
        let vars = [("user", ctx.mention()), ("achievement", def.name.clone())];
        effects.send(
            channel.clone(),
            template::render(&config.messages.achievement_unlocked, &vars),
        );

        if let Some(reward) = &def.reward {
            effects.extend(apply_reward(
                tracked,
                reward,
                config,
                ctx,
                &format!("achievement:{}", def.id),
            ));
            if let Some(message) = &reward.message {
                effects.send(
                    ctx.target_channel(reward.channel_id.as_ref().or(channel.as_ref())),
                    template::render(message, &vars),
                );
            }
        }
    }
    effects
}

/// Evaluate and unlock until nothing new unlocks.
///
/// Rewards can push a value over another threshold, so evaluation repeats;
/// every round unlocks at least one id, which bounds the loop by the catalog
/// size.
pub fn run(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
) -> SideEffects {
    let mut effects = SideEffects::default();
    loop {
        let unlocked = evaluate(tracked.profile(), config);
        if unlocked.is_empty() {
            return effects;
        }
        effects.extend(apply_unlocks(tracked, &unlocked, config, ctx));
    }
}
