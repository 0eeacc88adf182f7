//! Reward application shared by achievements and quests.

use guildxp_core::catalog::Reward;
use guildxp_core::config::GuildConfig;
use guildxp_core::tracked::TrackedProfile;

use crate::context::ActivityContext;
use crate::effects::SideEffects;
use crate::leveling::grant_xp;
use crate::shop::stock_item;
use crate::temp_roles::grant_role;

/// Apply the XP, gold, item and role parts of `reward`.
///
/// Items are looked up in the shop catalog and silently skipped when the
/// referenced item no longer exists. The reward message is left to the
/// caller, which knows the placeholders to fill.
pub fn apply_reward(
    tracked: &mut TrackedProfile,
    reward: &Reward,
    config: &GuildConfig,
    ctx: &ActivityContext,
    origin: &str,
) -> SideEffects {
    let mut effects = grant_xp(tracked, reward.xp, config, ctx, origin);

    if reward.gold != 0 {
        tracked.add_gold(reward.gold);
    }

    if let Some(item_id) = &reward.item_id {
        match config.shop.items.get(item_id) {
            Some(item) => stock_item(tracked, item_id, item, 1, ctx.now),
            None => tracing::debug!(item_id, origin, "Reward item no longer in catalog, skipping"),
        }
    }

    if let Some(role_id) = &reward.role_id {
        effects.extend(grant_role(tracked, config, role_id, origin, ctx));
    }

    effects
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use guildxp_core::catalog::ShopItem;
    use guildxp_core::profile::Profile;

    use super::*;

    #[test]
    fn applies_every_part_of_a_reward() {
        let mut config = GuildConfig::default();
        config.shop.items.insert(
            "badge".into(),
            ShopItem {
                name: "Badge".into(),
                price: 10,
                description: None,
                role_id: None,
            },
        );
        let reward = Reward {
            xp: 20,
            gold: 30,
            item_id: Some("badge".into()),
            role_id: Some("helper".into()),
            ..Default::default()
        };
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now());

        let effects = apply_reward(&mut tracked, &reward, &config, &ctx, "achievement:first");

        let profile = tracked.profile();
        assert_eq!((profile.xp, profile.gold), (20, 30));
        assert_eq!(profile.inventory["badge"].quantity, 1);
        assert_eq!(effects.roles_to_add[0].role_id, "helper");
        assert_eq!(
            tracked.pending().columns(),
            vec!["xp", "gold", "inventory"]
        );
    }

    #[test]
    fn missing_item_is_skipped() {
        let config = GuildConfig::default();
        let reward = Reward {
            item_id: Some("gone".into()),
            ..Default::default()
        };
        let mut tracked = TrackedProfile::new(Profile::new(1, 2));
        let ctx = ActivityContext::new("g", "u", Utc::now());

        assert!(apply_reward(&mut tracked, &reward, &config, &ctx, "quest:q").is_empty());
        assert!(tracked.profile().inventory.is_empty());
        assert!(!tracked.is_dirty());
    }
}
