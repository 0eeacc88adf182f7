//! Activity handlers: resolve ids, run the pipelines under the profile lock,
//! commit, apply side effects, then flush.
//!
//! Commands flush right away (subject to the write rate limit); passive
//! activity (messages, voice) only flushes once enough changes have piled
//! up, and otherwise leaves the write to the periodic flush-all.

use chrono::Utc;
use guildxp_cache::{GuildContext, ProfileKey};
use guildxp_core::config::GuildConfig;
use guildxp_core::leveling::xp_to_next_level;
use guildxp_core::tracked::TrackedProfile;
use guildxp_core::types::PlatformId;
use guildxp_events::bus::kinds;
use guildxp_events::GuildEvent;
use guildxp_pipeline::activity;
use guildxp_pipeline::daily::DailyRefusal;
use guildxp_pipeline::{ActivityContext, ApplyReport, SideEffects};
use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::services::Services;

/// Who acted, in which guild and channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub guild_id: PlatformId,
    pub user_id: PlatformId,
    pub channel_id: Option<PlatformId>,
}

impl Actor {
    pub fn new(guild_id: impl Into<PlatformId>, user_id: impl Into<PlatformId>) -> Self {
        Self {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
            channel_id: None,
        }
    }

    pub fn in_channel(mut self, channel_id: impl Into<PlatformId>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }
}

/// Response to a member command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Done(String),
    /// A domain refusal, shown only to the member who asked.
    Refused { reason: &'static str, message: String },
}

impl Reply {
    pub fn is_refused(&self) -> bool {
        matches!(self, Reply::Refused { .. })
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Reply::Done(_) => None,
            Reply::Refused { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flush {
    Now,
    IfDue,
}

struct Mutation<T> {
    value: T,
    guild: GuildContext,
    key: ProfileKey,
}

/// Lock the actor's profile, run `f` against it and commit the result.
async fn mutate<T>(
    services: &Services,
    actor: &Actor,
    f: impl FnOnce(&mut TrackedProfile, &GuildConfig, &ActivityContext) -> T,
) -> Result<Mutation<T>, HandlerError> {
    let guild = services.guilds.get(&actor.guild_id).await?;
    let user_id = services.users.resolve(&actor.user_id).await?;
    let key = ProfileKey::new(user_id, guild.id);

    let mut ctx = ActivityContext::new(actor.guild_id.clone(), actor.user_id.clone(), Utc::now());
    ctx.channel_id = actor.channel_id.clone();

    let mut session = services.profiles.checkout(key).await?;
    let value = f(session.tracked(), &guild.config, &ctx);
    services.profiles.commit(session).await;

    Ok(Mutation { value, guild, key })
}

/// Apply `effects` and flush the profile according to `flush`.
async fn finish(
    services: &Services,
    actor: &Actor,
    guild: &GuildContext,
    key: ProfileKey,
    effects: SideEffects,
    flush: Flush,
) -> Result<ApplyReport, HandlerError> {
    let report = services
        .applier
        .apply(&actor.guild_id, &actor.user_id, effects, &guild.config.logging)
        .await;
    let outcome = match flush {
        Flush::Now => services.profiles.flush(key).await?,
        Flush::IfDue => services.profiles.flush_if_due(key).await?,
    };
    tracing::debug!(%key, ?outcome, failures = report.failures, "Activity handled");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Passive activity
// ---------------------------------------------------------------------------

pub async fn on_message(services: &Services, actor: &Actor) -> Result<ApplyReport, HandlerError> {
    let Mutation { value, guild, key } = mutate(services, actor, |tracked, config, ctx| {
        activity::message(tracked, config, ctx, &mut rand::rng())
    })
    .await?;
    finish(services, actor, &guild, key, value, Flush::IfDue).await
}

/// A member left voice after `minutes` in `actor.channel_id`.
pub async fn on_voice_leave(
    services: &Services,
    actor: &Actor,
    minutes: i64,
) -> Result<ApplyReport, HandlerError> {
    let Mutation { value, guild, key } = mutate(services, actor, |tracked, config, ctx| {
        activity::voice_session(tracked, config, ctx, minutes)
    })
    .await?;
    finish(services, actor, &guild, key, value, Flush::IfDue).await
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub async fn claim_daily(services: &Services, actor: &Actor) -> Result<Reply, HandlerError> {
    let Mutation { value, guild, key } = mutate(services, actor, activity::daily).await?;
    match value {
        Ok(claim) => {
            let reply = format!(
                "+{} XP, +{} gold (streak {})",
                claim.xp, claim.gold, claim.streak
            );
            finish(services, actor, &guild, key, claim.effects, Flush::Now).await?;
            Ok(Reply::Done(reply))
        }
        Err(refusal) => {
            let DailyRefusal::Cooldown { ready_at } = refusal;
            Ok(Reply::Refused {
                reason: refusal.reason(),
                message: format!("{refusal} (ready <t:{}:R>)", ready_at.timestamp()),
            })
        }
    }
}

pub async fn accept_quest(
    services: &Services,
    actor: &Actor,
    quest_id: &str,
) -> Result<Reply, HandlerError> {
    let Mutation { value, guild, key } = mutate(services, actor, |tracked, config, ctx| {
        activity::quest_accept(tracked, config, quest_id, ctx)
    })
    .await?;
    match value {
        Ok(effects) => {
            finish(services, actor, &guild, key, effects, Flush::Now).await?;
            let name = guild
                .config
                .quest(quest_id)
                .map_or(quest_id, |q| q.name.as_str());
            Ok(Reply::Done(format!("Quest accepted: {name}")))
        }
        Err(refusal) => Ok(Reply::Refused {
            reason: refusal.reason(),
            message: refusal.to_string(),
        }),
    }
}

pub async fn claim_quest(
    services: &Services,
    actor: &Actor,
    quest_id: &str,
) -> Result<Reply, HandlerError> {
    let Mutation { value, guild, key } = mutate(services, actor, |tracked, config, ctx| {
        activity::quest_claim(tracked, config, quest_id, ctx)
    })
    .await?;
    match value {
        Ok(claim) => {
            let reply = format!("+{} XP, +{} gold", claim.reward.xp, claim.reward.gold);
            finish(services, actor, &guild, key, claim.effects, Flush::Now).await?;
            Ok(Reply::Done(reply))
        }
        Err(refusal) => Ok(Reply::Refused {
            reason: refusal.reason(),
            message: refusal.to_string(),
        }),
    }
}

pub async fn buy_item(
    services: &Services,
    actor: &Actor,
    item_id: &str,
    quantity: i64,
) -> Result<Reply, HandlerError> {
    let Mutation { value, guild, key } = mutate(services, actor, |tracked, config, ctx| {
        activity::purchase(tracked, config, item_id, quantity, ctx)
    })
    .await?;
    match value {
        Ok(purchase) => {
            let name = guild
                .config
                .shop
                .items
                .get(item_id)
                .map_or(item_id, |item| item.name.as_str());
            let reply = format!("Bought {quantity}x {name} for {} gold.", purchase.cost);
            finish(services, actor, &guild, key, purchase.effects, Flush::Now).await?;
            Ok(Reply::Done(reply))
        }
        Err(refusal) => Ok(Reply::Refused {
            reason: refusal.reason(),
            message: refusal.to_string(),
        }),
    }
}

/// Read-only profile card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub level: i32,
    pub xp: i64,
    /// `None` at the level cap.
    pub xp_to_next_level: Option<i64>,
    pub gold: i64,
    pub streak: i32,
    pub achievements: usize,
}

pub async fn show_profile(
    services: &Services,
    actor: &Actor,
) -> Result<ProfileSummary, HandlerError> {
    let guild = services.guilds.get(&actor.guild_id).await?;
    let user_id = services.users.resolve(&actor.user_id).await?;
    let entry = services
        .profiles
        .get_or_create(ProfileKey::new(user_id, guild.id))
        .await?;
    let profile = entry.profile();
    Ok(ProfileSummary {
        level: profile.level,
        xp: profile.xp,
        xp_to_next_level: xp_to_next_level(profile.xp, &guild.config.leveling),
        gold: profile.gold,
        streak: profile.streak_count,
        achievements: profile.achievements.len(),
    })
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// Validate and persist an admin config patch for a guild.
pub async fn update_guild_config(
    services: &Services,
    guild_id: &str,
    admin_id: &str,
    patch: Value,
) -> Result<GuildContext, HandlerError> {
    let keys: Vec<String> = patch
        .as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default();
    let updated = services.guilds.update_config(guild_id, patch).await?;
    services.bus.publish(
        GuildEvent::new(kinds::CONFIG_UPDATED)
            .with_guild(guild_id)
            .with_user(admin_id)
            .with_payload(json!({ "sections": keys })),
    );
    Ok(updated)
}
