//! Message and voice XP.

use guildxp_core::config::{GuildConfig, XpConfig};
use guildxp_core::profile::{stats, Profile};
use guildxp_core::tracked::TrackedProfile;
use guildxp_core::types::Timestamp;
use rand::Rng;

use crate::context::ActivityContext;
use crate::effects::SideEffects;
use crate::leveling::grant_xp;

#[derive(Debug, Clone, PartialEq)]
pub struct XpGain {
    /// XP granted, zero when the message was on cooldown.
    pub granted: i64,
    pub effects: SideEffects,
}

/// Uniform roll in `[message_xp_min, message_xp_max]`.
pub fn roll_message_xp<R: Rng>(xp: &XpConfig, rng: &mut R) -> i64 {
    if xp.message_xp_max <= xp.message_xp_min {
        return xp.message_xp_min;
    }
    rng.random_range(xp.message_xp_min..=xp.message_xp_max)
}

/// `true` while the last rewarded message is within the cooldown.
pub fn on_message_cooldown(profile: &Profile, xp: &XpConfig, now: Timestamp) -> bool {
    profile.last_message_at.is_some_and(|at| {
        chrono::Duration::try_seconds(xp.message_cooldown_seconds.max(0))
            .is_none_or(|cooldown| now.signed_duration_since(at) < cooldown)
    })
}

/// Count the message and, outside the cooldown, grant a random amount of XP.
pub fn message_xp<R: Rng>(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
    rng: &mut R,
) -> XpGain {
    tracked.increment_stat(stats::MESSAGES, 1);
    if on_message_cooldown(tracked.profile(), &config.xp, ctx.now) {
        return XpGain {
            granted: 0,
            effects: SideEffects::default(),
        };
    }

    let amount = roll_message_xp(&config.xp, rng);
    tracked.set_last_message_at(Some(ctx.now));
    let effects = grant_xp(tracked, amount, config, ctx, "message");
    XpGain {
        granted: amount,
        effects,
    }
}

/// Grant `minutes * voice_xp_per_minute` for a finished voice session.
pub fn voice_xp(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
    minutes: i64,
) -> XpGain {
    if minutes <= 0 {
        return XpGain {
            granted: 0,
            effects: SideEffects::default(),
        };
    }
    tracked.increment_stat(stats::VOICE_MINUTES, minutes);
    let amount = minutes.saturating_mul(config.xp.voice_xp_per_minute);
    let effects = grant_xp(tracked, amount, config, ctx, "voice");
    XpGain {
        granted: amount.max(0),
        effects,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn roll_stays_in_range() {
        let xp = XpConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let amount = roll_message_xp(&xp, &mut rng);
            assert!((xp.message_xp_min..=xp.message_xp_max).contains(&amount));
        }
    }

    #[test]
    fn degenerate_range_returns_min() {
        let xp = XpConfig {
            message_xp_min: 10,
            message_xp_max: 10,
            ..Default::default()
        };
        assert_eq!(roll_message_xp(&xp, &mut StdRng::seed_from_u64(1)), 10);
    }

    #[test]
    fn cooldown_blocks_xp_but_counts_message() {
        let config = GuildConfig::default();
        let now = Utc::now();
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let mut rng = StdRng::seed_from_u64(3);

        let first = message_xp(&mut tracked, &config, &ActivityContext::new("g", "u", now), &mut rng);
        let later = ActivityContext::new("g", "u", now + Duration::seconds(30));
        let second = message_xp(&mut tracked, &config, &later, &mut rng);

        assert!(first.granted >= 15);
        assert_eq!(second.granted, 0);
        assert_eq!(tracked.profile().xp, first.granted);
        assert_eq!(tracked.profile().stat(stats::MESSAGES), 2);
        assert_eq!(tracked.profile().last_message_at, Some(now));

        let after = ActivityContext::new("g", "u", now + Duration::seconds(60));
        assert!(message_xp(&mut tracked, &config, &after, &mut rng).granted > 0);
    }

    #[test]
    fn voice_minutes_scale_xp() {
        let config = GuildConfig::default();
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let gain = voice_xp(&mut tracked, &config, &ActivityContext::new("g", "u", Utc::now()), 12);

        assert_eq!(gain.granted, 60);
        assert_eq!(tracked.profile().stat(stats::VOICE_MINUTES), 12);
    }
}
