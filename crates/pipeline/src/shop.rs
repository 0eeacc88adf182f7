//! Shop purchases against the guild catalog.

use guildxp_core::catalog::ShopItem;
use guildxp_core::config::GuildConfig;
use guildxp_core::profile::{stats, InventoryItem};
use guildxp_core::tracked::TrackedProfile;
use guildxp_core::types::Timestamp;
use guildxp_events::bus::kinds;
use serde_json::json;

use crate::context::ActivityContext;
use crate::effects::SideEffects;
use crate::temp_roles::grant_role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseRefusal {
    #[error("That item is not for sale")]
    UnknownItem,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Not enough gold: costs {cost}, you have {balance}")]
    InsufficientGold { cost: i64, balance: i64 },
}

impl PurchaseRefusal {
    pub fn reason(&self) -> &'static str {
        match self {
            PurchaseRefusal::UnknownItem => "unknown_item",
            PurchaseRefusal::InvalidQuantity => "invalid_quantity",
            PurchaseRefusal::InsufficientGold { .. } => "insufficient_gold",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub cost: i64,
    pub effects: SideEffects,
}

/// Buy `quantity` of `item_id`: deduct gold, stock the inventory, count the
/// spend and grant the item's role.
pub fn buy(
    tracked: &mut TrackedProfile,
    config: &GuildConfig,
    item_id: &str,
    quantity: i64,
    ctx: &ActivityContext,
) -> Result<Purchase, PurchaseRefusal> {
    let item = config
        .shop
        .items
        .get(item_id)
        .ok_or(PurchaseRefusal::UnknownItem)?;
    if quantity <= 0 {
        return Err(PurchaseRefusal::InvalidQuantity);
    }
    let balance = tracked.profile().gold;
    let cost = item.price.checked_mul(quantity).unwrap_or(i64::MAX);
    if cost > balance {
        return Err(PurchaseRefusal::InsufficientGold { cost, balance });
    }

    tracked.add_gold(-cost);
    stock_item(tracked, item_id, item, quantity, ctx.now);
    tracked.increment_stat(stats::GOLD_SPENT, cost);

    let mut effects = SideEffects::default();
    effects.record(ctx.event(
        kinds::SHOP_PURCHASE,
        json!({ "itemId": item_id, "quantity": quantity, "cost": cost }),
    ));
    if let Some(role_id) = &item.role_id {
        effects.extend(grant_role(
            tracked,
            config,
            role_id,
            &format!("shop:{item_id}"),
            ctx,
        ));
    }
    Ok(Purchase { cost, effects })
}

/// Add `quantity` of a catalog item to the inventory.
pub(crate) fn stock_item(
    tracked: &mut TrackedProfile,
    item_id: &str,
    item: &ShopItem,
    quantity: i64,
    now: Timestamp,
) {
    tracked.update_inventory(|inventory| {
        inventory
            .entry(item_id.to_string())
            .and_modify(|owned| owned.quantity = owned.quantity.saturating_add(quantity))
            .or_insert_with(|| InventoryItem {
                item_id: item_id.to_string(),
                name: item.name.clone(),
                quantity,
                acquired_at: now,
            });
    });
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use guildxp_core::profile::Profile;

    use super::*;

    fn config() -> GuildConfig {
        let mut config = GuildConfig::default();
        config.shop.items.insert(
            "potion".into(),
            ShopItem {
                name: "Potion".into(),
                price: 25,
                description: None,
                role_id: None,
            },
        );
        config.shop.items.insert(
            "vip".into(),
            ShopItem {
                name: "VIP Pass".into(),
                price: 100,
                description: None,
                role_id: Some("vip-role".into()),
            },
        );
        config
    }

    fn rich(gold: i64) -> TrackedProfile {
        let mut profile = Profile::new(1, 2);
        profile.gold = gold;
        TrackedProfile::new(profile)
    }

    #[test]
    fn purchase_deducts_and_stocks() {
        let mut tracked = rich(100);
        let ctx = ActivityContext::new("g", "u", Utc::now());

        let purchase = buy(&mut tracked, &config(), "potion", 2, &ctx).unwrap();
        buy(&mut tracked, &config(), "potion", 1, &ctx).unwrap();

        assert_eq!(purchase.cost, 50);
        assert_eq!(tracked.profile().gold, 25);
        assert_eq!(tracked.profile().inventory["potion"].quantity, 3);
        assert_eq!(tracked.profile().stat(stats::GOLD_SPENT), 75);
        assert_eq!(purchase.effects.event_types(), vec!["shop.purchase"]);
    }

    #[test]
    fn item_role_is_granted() {
        let mut tracked = rich(100);
        let ctx = ActivityContext::new("g", "u", Utc::now());
        let purchase = buy(&mut tracked, &config(), "vip", 1, &ctx).unwrap();
        assert_eq!(purchase.effects.roles_to_add[0].role_id, "vip-role");
        assert_eq!(purchase.effects.roles_to_add[0].reason, "shop:vip");
    }

    #[test]
    fn refusals_leave_profile_untouched() {
        let ctx = ActivityContext::new("g", "u", Utc::now());
        let mut tracked = rich(30);

        assert_matches!(
            buy(&mut tracked, &config(), "missing", 1, &ctx),
            Err(PurchaseRefusal::UnknownItem)
        );
        assert_matches!(
            buy(&mut tracked, &config(), "potion", 0, &ctx),
            Err(PurchaseRefusal::InvalidQuantity)
        );
        assert_matches!(
            buy(&mut tracked, &config(), "potion", 2, &ctx),
            Err(PurchaseRefusal::InsufficientGold { cost: 50, balance: 30 })
        );
        assert!(!tracked.is_dirty());
    }

    #[test]
    fn overflowing_cost_is_unaffordable() {
        let ctx = ActivityContext::new("g", "u", Utc::now());
        let mut tracked = rich(i64::MAX - 1);
        assert_matches!(
            buy(&mut tracked, &config(), "potion", i64::MAX, &ctx),
            Err(PurchaseRefusal::InsufficientGold { .. })
        );
    }
}
