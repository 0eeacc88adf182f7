//! Role grants with a computed expiry, removed on the next refresh.
//!
//! Expiry is pull-based: nothing fires at `expires_at`. An expired role stays
//! on the member until [`refresh_temp_roles`] runs for them.

use guildxp_core::catalog::TempRoleConfig;
use guildxp_core::config::GuildConfig;
use guildxp_core::profile::TempRoleGrant;
use guildxp_core::tracked::TrackedProfile;
use guildxp_core::types::Timestamp;
use guildxp_events::bus::kinds;
use serde_json::json;

use crate::context::{later, ActivityContext};
use crate::effects::SideEffects;

/// `min(now + default duration, hard expiry)`.
pub fn expiry_for(temp: &TempRoleConfig, now: Timestamp) -> Timestamp {
    let by_duration = later(now, chrono::Duration::try_minutes(temp.default_duration_minutes));
    match temp.hard_expiry_at {
        Some(hard) => by_duration.min(hard),
        None => by_duration,
    }
}

/// Grant `role_id`, recording an expiry when the role is configured as
/// temporary.
///
/// Re-granting a held temp role never shortens its expiry. A temp role whose
/// hard expiry has already passed is not granted at all.
pub fn grant_role(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    role_id: &str,
    source: &str,
    ctx: &ActivityContext,
) -> SideEffects {
    let mut effects = SideEffects::default();
    let Some(temp) = config.temp_roles.get(role_id) else {
        effects.add_role(role_id, source);
        return effects;
    };

    let mut expires_at = expiry_for(temp, ctx.now);
    if expires_at <= ctx.now {
        tracing::debug!(role_id, "Temp role past its hard expiry, not granting");
        return effects;
    }
    if let Some(existing) = tracked.profile().temp_roles.get(role_id) {
        expires_at = expires_at.max(existing.expires_at);
    }

    tracked.update_temp_roles(|roles| {
        roles.insert(
            role_id.to_string(),
            TempRoleGrant {
                expires_at,
                source: source.to_string(),
            },
        )
    });
    effects.add_role(role_id, source);
    effects.record(ctx.event(
        kinds::TEMP_ROLE_GRANTED,
        json!({ "roleId": role_id, "expiresAt": expires_at, "source": source }),
    ));
    effects
}

/// Strip every temp role with `expires_at <= now`.
///
/// The profile is only touched when something expired.
pub fn refresh_temp_roles(tracked: &mut TrackedProfile, ctx: &ActivityContext) -> SideEffects {
    let mut effects = SideEffects::default();
    let expired: Vec<(String, TempRoleGrant)> = tracked
        .profile()
        .temp_roles
        .iter()
        .filter(|(_, grant)| grant.expires_at <= ctx.now)
        .map(|(id, grant)| (id.clone(), grant.clone()))
        .collect();
    if expired.is_empty() {
        return effects;
    }

    tracked.update_temp_roles(|roles| {
        for (role_id, _) in &expired {
            roles.remove(role_id);
        }
    });
    for (role_id, grant) in expired {
        effects.record(ctx.event(
            kinds::TEMP_ROLE_EXPIRED,
            json!({ "roleId": role_id, "expiredAt": grant.expires_at, "source": grant.source }),
        ));
        effects.remove_role(role_id, "temp:expired");
    }
    effects
}
