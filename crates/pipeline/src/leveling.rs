//! XP grants and the level recomputation that follows them.

use guildxp_core::config::GuildConfig;
use guildxp_core::leveling::level_from_xp;
use guildxp_core::tracked::TrackedProfile;
use guildxp_events::bus::kinds;
use serde_json::json;

use crate::context::ActivityContext;
use crate::effects::SideEffects;
use crate::template;
use crate::temp_roles::grant_role;

/// Add `amount` XP and settle the level. Non-positive amounts are ignored.
pub fn grant_xp(
    tracked: &mut TrackedProfile,
    amount: i64,
    config: &GuildConfig,
    ctx: &ActivityContext,
    source: &str,
) -> SideEffects {
    let mut effects = SideEffects::default();
    if amount <= 0 {
        return effects;
    }
    let total = tracked.add_xp(amount);
    effects.record(ctx.event(
        kinds::XP_GRANTED,
        json!({ "amount": amount, "total": total, "source": source }),
    ));
    effects.extend(sync_level(tracked, config, ctx));
    effects
}

/// Recompute the level from XP and mirror it when it changed.
///
/// Only a rise announces the new level and grants the level roles crossed
/// on the way; a drop (admin override) just stores the lower level. Level
/// roles configured as temp roles get an expiry like any other grant.
pub fn sync_level(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
) -> SideEffects {
    let mut effects = SideEffects::default();
    let old = tracked.profile().level;
    let new = i32::try_from(level_from_xp(tracked.profile().xp, &config.leveling))
        .unwrap_or(i32::MAX);
    if new == old {
        return effects;
    }
    tracked.set_level(new);
    if new < old {
        return effects;
    }

    effects.record(ctx.event(kinds::LEVEL_UP, json!({ "from": old, "to": new })));
    effects.send(
        ctx.target_channel(config.announcements.level_up_channel_id.as_ref()),
        template::render(
            &config.messages.level_up,
            &[("user", ctx.mention()), ("level", new.to_string())],
        ),
    );

    let crossed = (old.max(0) as u32 + 1)..=(new as u32);
    for (level, role_id) in config.level_roles.range(crossed) {
        let source = format!("level:{level}");
        effects.extend(grant_role(tracked, config, role_id, &source, ctx));
    }
    effects
}
