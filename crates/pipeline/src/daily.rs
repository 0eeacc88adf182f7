//! Daily claim with a consecutive-day streak bonus.

use guildxp_core::config::{DailyConfig, GuildConfig};
use guildxp_core::profile::stats;
use guildxp_core::tracked::TrackedProfile;
use guildxp_core::types::Timestamp;
use guildxp_events::bus::kinds;
use serde_json::json;

use crate::context::{later, ActivityContext};
use crate::effects::SideEffects;
use crate::leveling::grant_xp;
use crate::template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DailyRefusal {
    #[error("Daily reward already claimed, come back later")]
    Cooldown { ready_at: Timestamp },
}

impl DailyRefusal {
    pub fn reason(&self) -> &'static str {
        match self {
            DailyRefusal::Cooldown { .. } => "cooldown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyClaim {
    pub streak: i32,
    pub xp: i64,
    pub gold: i64,
    pub effects: SideEffects,
}

/// Streak after a claim at `now`: one more than `current` when the previous
/// claim is inside the streak window, otherwise a fresh streak of 1.
pub fn next_streak(
    last_claim: Option<Timestamp>,
    current: i32,
    daily: &DailyConfig,
    now: Timestamp,
) -> i32 {
    let within_window = |at: Timestamp| {
        chrono::Duration::try_hours(daily.streak_window_hours)
            .is_none_or(|window| now.signed_duration_since(at) <= window)
    };
    match last_claim {
        Some(at) if within_window(at) => current.max(0).saturating_add(1),
        _ => 1,
    }
}

/// `1 + multiplier * (streak - 1)`.
pub fn streak_factor(multiplier: f64, streak: i32) -> f64 {
    1.0 + multiplier * f64::from(streak.max(1) - 1)
}

/// `floor(base * factor)`, saturating at the `i64` bounds.
pub fn scale(base: i64, factor: f64) -> i64 {
    let scaled = (base as f64 * factor).floor();
    if scaled.is_nan() {
        return base;
    }
    // `as` saturates on overflow.
    scaled as i64
}

/// Claim the daily reward, or report when it becomes available again.
pub fn claim_daily(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
) -> Result<DailyClaim, DailyRefusal> {
    let daily = &config.daily;
    let last = tracked.profile().last_daily_at;
    if let Some(at) = last {
        let ready_at = later(at, chrono::Duration::try_hours(daily.cooldown_hours));
        if ctx.now < ready_at {
            return Err(DailyRefusal::Cooldown { ready_at });
        }
    }

    let streak = next_streak(last, tracked.profile().streak_count, daily, ctx.now);
    let factor = streak_factor(daily.streak_multiplier, streak);
    let xp = scale(daily.xp, factor);
    let gold = scale(daily.gold, factor);

    tracked.set_streak_count(streak);
    tracked.set_last_daily_at(Some(ctx.now));
    tracked.increment_stat(stats::DAILY_CLAIMS, 1);
    tracked.add_gold(gold);
    let mut effects = grant_xp(tracked, xp, config, ctx, "daily");

    effects.record(ctx.event(
        kinds::DAILY_CLAIMED,
        json!({ "streak": streak, "xp": xp, "gold": gold }),
    ));
    effects.send(
        ctx.channel_id.clone(),
        template::render(
            &config.messages.daily_claimed,
            &[
                ("user", ctx.mention()),
                ("xp", xp.to_string()),
                ("gold", gold.to_string()),
                ("streak", streak.to_string()),
            ],
        ),
    );

    Ok(DailyClaim {
        streak,
        xp,
        gold,
        effects,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use guildxp_core::profile::Profile;

    use super::*;

    fn claimed_ago(hours: i64, streak: i32) -> (TrackedProfile, Timestamp) {
        let now = Utc::now();
        let mut profile = Profile::new(1, 2);
        profile.last_daily_at = Some(now - Duration::hours(hours));
        profile.streak_count = streak;
        (TrackedProfile::new(profile), now)
    }

    #[test]
    fn first_claim_starts_streak() {
        let config = GuildConfig::default();
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now()).in_channel("c");

        let claim = claim_daily(&mut tracked, &config, &ctx).unwrap();

        assert_eq!((claim.streak, claim.xp, claim.gold), (1, 100, 50));
        assert_eq!(tracked.profile().gold, 50);
        assert_eq!(tracked.profile().stat(stats::DAILY_CLAIMS), 1);
        assert_eq!(
            claim.effects.messages.last().unwrap().content,
            "<@u> claimed their daily: +100 XP, +50 gold (streak 1)."
        );
    }

    #[test]
    fn claim_within_window_extends_streak_with_bonus() {
        let mut config = GuildConfig::default();
        config.daily.xp = 105;
        config.daily.gold = 55;
        config.daily.streak_multiplier = 0.1;
        let (mut tracked, now) = claimed_ago(30, 1);

        let claim = claim_daily(&mut tracked, &config, &ActivityContext::new("g", "u", now)).unwrap();

        // factor 1.1: floor(115.5) and floor(60.5).
        assert_eq!(claim.streak, 2);
        assert_eq!(claim.xp, 115);
        assert_eq!(claim.gold, 60);
        assert_eq!(tracked.profile().streak_count, 2);
    }

    #[test]
    fn claim_after_window_resets_streak() {
        let config = GuildConfig::default();
        let (mut tracked, now) = claimed_ago(49, 6);
        let claim = claim_daily(&mut tracked, &config, &ActivityContext::new("g", "u", now)).unwrap();
        assert_eq!(claim.streak, 1);
        assert_eq!(claim.xp, 100);
    }

    #[test]
    fn claim_inside_cooldown_is_refused() {
        let config = GuildConfig::default();
        let (mut tracked, now) = claimed_ago(10, 3);
        let last = tracked.profile().last_daily_at.unwrap();

        let result = claim_daily(&mut tracked, &config, &ActivityContext::new("g", "u", now));

        assert_matches!(result, Err(DailyRefusal::Cooldown { ready_at }) if ready_at == last + Duration::hours(24));
        assert!(!tracked.is_dirty());
    }

    #[test]
    fn scale_floors() {
        assert_eq!(scale(10, 1.25), 12);
        assert_eq!(scale(7, 1.0), 7);
        assert_eq!(streak_factor(0.5, 3), 2.0);
    }
}
