//! Fixed-order compositions of the pipelines, one per kind of activity.
//!
//! Every composition runs against one tracked profile in the same order:
//! the activity's own XP step (which settles the level), temp-role refresh,
//! quest progress, then achievements. Each step sees the mutations of the
//! steps before it. XP earned before the quest step feeds `earnXp` quests;
//! XP from achievement rewards does not.

use guildxp_core::config::GuildConfig;
use guildxp_core::tracked::TrackedProfile;
use rand::Rng;

use crate::achievements;
use crate::context::ActivityContext;
use crate::daily::{self, DailyClaim, DailyRefusal};
use crate::effects::SideEffects;
use crate::quests::{self, QuestClaim, QuestEvent, QuestRefusal};
use crate::shop::{self, Purchase, PurchaseRefusal};
use crate::temp_roles::refresh_temp_roles;
use crate::xp;

/// Steps shared by every activity after its own mutation.
fn settle(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
    xp_before: i64,
    mut quest_events: Vec<QuestEvent>,
) -> SideEffects {
    let mut effects = refresh_temp_roles(tracked, ctx);

    let earned = tracked.profile().xp.saturating_sub(xp_before);
    if earned > 0 {
        quest_events.push(QuestEvent::EarnXp { amount: earned });
    }
    for event in &quest_events {
        effects.extend(quests::apply_event(tracked, config, event, ctx));
    }

    effects.extend(achievements::run(tracked, config, ctx));
    effects
}

/// A chat message in `ctx.channel_id`.
pub fn message<R: Rng>(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
    rng: &mut R,
) -> SideEffects {
    let xp_before = tracked.profile().xp;
    let mut effects = xp::message_xp(tracked, config, ctx, rng).effects;
    let event = QuestEvent::Messages {
        channel_id: ctx.channel_id.clone(),
        count: 1,
    };
    effects.extend(settle(tracked, config, ctx, xp_before, vec![event]));
    effects
}

/// A finished voice session of `minutes` in `ctx.channel_id`.
pub fn voice_session(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
    minutes: i64,
) -> SideEffects {
    let xp_before = tracked.profile().xp;
    let mut effects = xp::voice_xp(tracked, config, ctx, minutes).effects;
    let event = QuestEvent::VcMinutes {
        channel_id: ctx.channel_id.clone(),
        minutes,
    };
    effects.extend(settle(tracked, config, ctx, xp_before, vec![event]));
    effects
}

pub fn daily(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    ctx: &ActivityContext,
) -> Result<DailyClaim, DailyRefusal> {
    let xp_before = tracked.profile().xp;
    let mut claim = daily::claim_daily(tracked, config, ctx)?;
    claim
        .effects
        .extend(settle(tracked, config, ctx, xp_before, vec![QuestEvent::DailyClaim]));
    Ok(claim)
}

pub fn purchase(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    item_id: &str,
    quantity: i64,
    ctx: &ActivityContext,
) -> Result<Purchase, PurchaseRefusal> {
    let xp_before = tracked.profile().xp;
    let mut purchase = shop::buy(tracked, config, item_id, quantity, ctx)?;
    let event = QuestEvent::SpendGold {
        amount: purchase.cost,
    };
    purchase
        .effects
        .extend(settle(tracked, config, ctx, xp_before, vec![event]));
    Ok(purchase)
}

pub fn quest_accept(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    quest_id: &str,
    ctx: &ActivityContext,
) -> Result<SideEffects, QuestRefusal> {
    let mut effects = quests::accept(tracked, config, quest_id, ctx)?;
    effects.extend(refresh_temp_roles(tracked, ctx));
    Ok(effects)
}

/// Claim a quest; its reward XP counts toward other active `earnXp` quests.
pub fn quest_claim(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    quest_id: &str,
    ctx: &ActivityContext,
) -> Result<QuestClaim, QuestRefusal> {
    let xp_before = tracked.profile().xp;
    let mut claim = quests::claim(tracked, config, quest_id, ctx)?;
    claim
        .effects
        .extend(settle(tracked, config, ctx, xp_before, Vec::new()));
    Ok(claim)
}
