use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::cart::{CartLineItem, CartPricing, ExpandedLineItem, ProgramStub, PROVENANCE_KEYS};
use crate::models::common::{format_inr, round_paise, round_whole};

/// Type given to a bundled program whose stub does not name one.
pub const BUNDLE_DERIVED_TYPE: &str = "bundle-derived";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingPolicy {
    /// Promotional discount applied to every item bought outside a bundle.
    pub regular_discount_percent: Decimal,
    /// Floor the grand total at zero when discounts exceed the subtotal.
    pub clamp_negative_total: bool,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            regular_discount_percent: Decimal::from(20),
            clamp_negative_total: true,
        }
    }
}

/// Flattens the cart so every purchasable program is its own line.
///
/// Bundles with programs become one line per program, placed where the
/// bundle was; everything else passes through with `is_from_bundle = false`.
pub fn expand_bundles_for_checkout(cart: &[CartLineItem]) -> Vec<ExpandedLineItem> {
    let mut expanded = Vec::with_capacity(cart.len());
    for item in cart {
        if item.is_expandable_bundle() {
            expanded.extend(expand_bundle(item));
        } else {
            expanded.push(ExpandedLineItem::from(item.clone()));
        }
    }
    expanded
}

fn expand_bundle(bundle: &CartLineItem) -> Vec<ExpandedLineItem> {
    let program_count = bundle.programs.len() as u32;

    bundle
        .programs
        .iter()
        .enumerate()
        .map(|(index, stub)| expand_program(bundle, stub, index, program_count))
        .collect()
}

fn expand_program(
    bundle: &CartLineItem,
    stub: &ProgramStub,
    index: usize,
    program_count: u32,
) -> ExpandedLineItem {
    let mut extra = stub.extra.clone();
    for key in PROVENANCE_KEYS {
        extra.remove(key);
    }
    if let Some(program_id) = extra.remove("id") {
        extra.insert("programId".to_string(), program_id);
    }

    let persons = take_u32(&mut extra, "persons").or(bundle.persons).unwrap_or(1);
    let quantity = take_u32(&mut extra, "quantity").or(bundle.quantity).unwrap_or(1);
    let subscription_type = take_string(&mut extra, "subscriptionType");
    let variant = take_string(&mut extra, "variant");

    ExpandedLineItem {
        id: format!("{}-program-{}", bundle.id, index),
        title: stub.title.clone(),
        price: Some(stub.price.unwrap_or(Decimal::ZERO)),
        item_type: stub
            .program_type
            .clone()
            .unwrap_or_else(|| BUNDLE_DERIVED_TYPE.to_string()),
        persons: Some(persons),
        quantity: Some(quantity),
        image: stub.image.clone().or_else(|| bundle.image.clone()),
        subscription_type,
        variant,
        is_from_bundle: true,
        original_bundle_id: Some(bundle.id.clone()),
        bundle_id: bundle.bundle_id.clone().or_else(|| Some(bundle.id.clone())),
        bundle_variant: bundle.variant.clone(),
        bundle_name: Some(bundle.title.clone()),
        bundle_discount: bundle.discount,
        bundle_total_price: bundle.original_price,
        bundle_program_count: Some(program_count),
        extra,
    }
}

fn take_u32(extra: &mut Map<String, Value>, key: &str) -> Option<u32> {
    extra
        .remove(key)
        .and_then(|value| value.as_u64())
        .and_then(|value| u32::try_from(value).ok())
}

fn take_string(extra: &mut Map<String, Value>, key: &str) -> Option<String> {
    match extra.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

pub fn calculate_expanded_cart_pricing(items: &[ExpandedLineItem]) -> CartPricing {
    calculate_expanded_cart_pricing_with(items, &PricingPolicy::default())
}

/// Prices an expanded cart.
///
/// A bundle's discount is approximated as its list price times its
/// percentage divided by its program count, split evenly across the lines it
/// expanded into. Items outside bundles get the flat promotional discount,
/// rounded to whole rupees per line. Sums saturate rather than overflow, so
/// absurd quantities price at `Decimal::MAX` instead of failing.
pub fn calculate_expanded_cart_pricing_with(
    items: &[ExpandedLineItem],
    policy: &PricingPolicy,
) -> CartPricing {
    let mut subtotal = Decimal::ZERO;
    let mut bundle_discount = Decimal::ZERO;
    let mut regular_discount = Decimal::ZERO;

    for item in items {
        let item_total = item.line_total();
        subtotal = subtotal.saturating_add(item_total);

        if item.is_from_bundle {
            if let (Some(percent), Some(bundle_price)) = (item.bundle_discount, item.bundle_total_price) {
                let count = Decimal::from(
                    item.bundle_program_count
                        .filter(|count| *count > 0)
                        .unwrap_or(1),
                );
                // The bundle is credited price × percent / count in total,
                // spread evenly over the lines it expanded into.
                let attributed = bundle_price.saturating_mul(percent) / Decimal::ONE_HUNDRED / count;
                bundle_discount = bundle_discount.saturating_add(attributed / count);
            }
        } else {
            let discount = item_total.saturating_mul(policy.regular_discount_percent) / Decimal::ONE_HUNDRED;
            regular_discount = regular_discount.saturating_add(round_whole(discount));
        }
    }

    let bundle_discount = round_paise(bundle_discount);
    let total_discount = bundle_discount.saturating_add(regular_discount);
    let mut total = subtotal.saturating_sub(total_discount);

    if total < Decimal::ZERO && policy.clamp_negative_total {
        log::warn!(
            "Discounts {} exceed subtotal {}, clamping total to zero",
            format_inr(total_discount),
            format_inr(subtotal)
        );
        total = Decimal::ZERO;
    }

    CartPricing {
        subtotal,
        bundle_discount,
        regular_discount,
        total_discount,
        total,
        expanded_items: items.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn three_pack() -> CartLineItem {
        serde_json::from_value(json!({
            "id": "b1",
            "type": "bundle",
            "title": "3-Pack",
            "variant": "monthly",
            "discount": 10,
            "originalPrice": 3000,
            "image": "pack.jpg",
            "programs": [
                {"title": "A", "price": 1000, "type": "live"},
                {"title": "B", "price": 1000, "type": "live", "image": "b.jpg"},
                {"title": "C", "price": 1000, "type": "live", "sessionId": "s-9"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_bundle_expands_in_order() {
        let expanded = expand_bundles_for_checkout(&[three_pack()]);

        assert_eq!(expanded.len(), 3);
        let titles: Vec<&str> = expanded.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);

        for (index, item) in expanded.iter().enumerate() {
            assert_eq!(item.id, format!("b1-program-{}", index));
            assert!(item.is_from_bundle);
            assert_eq!(item.bundle_variant.as_deref(), Some("monthly"));
            assert_eq!(item.bundle_name.as_deref(), Some("3-Pack"));
            assert_eq!(item.original_bundle_id.as_deref(), Some("b1"));
            assert_eq!(item.bundle_discount, Some(Decimal::from(10)));
            assert_eq!(item.bundle_total_price, Some(Decimal::from(3000)));
            assert_eq!(item.bundle_program_count, Some(3));
            assert_eq!(item.persons, Some(1));
            assert_eq!(item.quantity, Some(1));
        }
    }

    #[test]
    fn test_bundle_children_inherit_and_merge() {
        let expanded = expand_bundles_for_checkout(&[three_pack()]);

        assert_eq!(expanded[0].image.as_deref(), Some("pack.jpg"));
        assert_eq!(expanded[1].image.as_deref(), Some("b.jpg"));
        assert_eq!(expanded[2].extra.get("sessionId"), Some(&json!("s-9")));
    }

    #[test]
    fn test_stub_without_price_or_type() {
        let bundle: CartLineItem = serde_json::from_value(json!({
            "id": "b2",
            "type": "bundle",
            "title": "Mystery Pack",
            "persons": 2,
            "programs": [{"title": "Surprise", "persons": 3, "id": "prog-77"}]
        }))
        .unwrap();

        let expanded = expand_bundles_for_checkout(&[bundle]);
        assert_eq!(expanded[0].price, Some(Decimal::ZERO));
        assert_eq!(expanded[0].item_type, BUNDLE_DERIVED_TYPE);
        assert_eq!(expanded[0].persons, Some(3));
        assert_eq!(expanded[0].id, "b2-program-0");
        assert_eq!(expanded[0].extra.get("programId"), Some(&json!("prog-77")));
    }

    #[test]
    fn test_mixed_cart_keeps_relative_order() {
        let cart = vec![
            CartLineItem::simple("s1", "Sound Bath", Decimal::from(800), "recorded"),
            three_pack(),
            CartLineItem::simple("s2", "Guide Call", Decimal::from(1500), "guide"),
        ];

        let expanded = expand_bundles_for_checkout(&cart);
        let ids: Vec<&str> = expanded.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "b1-program-0", "b1-program-1", "b1-program-2", "s2"]);
        assert!(!expanded[0].is_from_bundle);
        assert!(!expanded[4].is_from_bundle);
    }

    #[test]
    fn test_empty_bundle_passes_through() {
        let bundle: CartLineItem = serde_json::from_value(json!({
            "id": "b3",
            "type": "bundle",
            "title": "Placeholder",
            "price": 500,
            "variant": "quarterly",
            "programs": []
        }))
        .unwrap();

        let expanded = expand_bundles_for_checkout(&[bundle]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].id, "b3");
        assert_eq!(expanded[0].item_type, "bundle");
        assert!(!expanded[0].is_from_bundle);
        assert_eq!(expanded[0].variant.as_deref(), Some("quarterly"));
    }

    #[test]
    fn test_expansion_is_stable() {
        let cart = vec![three_pack()];
        assert_eq!(expand_bundles_for_checkout(&cart), expand_bundles_for_checkout(&cart));
    }

    #[test]
    fn test_three_pack_pricing() {
        let expanded = expand_bundles_for_checkout(&[three_pack()]);
        let pricing = calculate_expanded_cart_pricing(&expanded);

        assert_eq!(pricing.subtotal, Decimal::from(3000));
        assert_eq!(pricing.bundle_discount, Decimal::from(100));
        assert_eq!(pricing.regular_discount, Decimal::ZERO);
        assert_eq!(pricing.total_discount, Decimal::from(100));
        assert_eq!(pricing.total, Decimal::from(2900));
        assert_eq!(pricing.expanded_items.len(), 3);
    }

    #[test]
    fn test_regular_discount_rounds_per_item() {
        let mut retreat = CartLineItem::simple("r1", "Retreat", Decimal::from(1234), "retreat");
        retreat.persons = Some(2);
        let class = CartLineItem::simple("c1", "Class", Decimal::from(333), "live");

        let expanded = expand_bundles_for_checkout(&[retreat, class]);
        let pricing = calculate_expanded_cart_pricing(&expanded);

        // 2468 * 0.2 = 493.6 -> 494, 333 * 0.2 = 66.6 -> 67
        assert_eq!(pricing.subtotal, Decimal::from(2801));
        assert_eq!(pricing.regular_discount, Decimal::from(561));
        assert_eq!(pricing.bundle_discount, Decimal::ZERO);
        assert_eq!(pricing.total, Decimal::from(2240));
    }

    #[test]
    fn test_bundle_discount_needs_both_fields() {
        let mut expanded = expand_bundles_for_checkout(&[three_pack()]);
        for item in expanded.iter_mut() {
            item.bundle_total_price = None;
        }

        let pricing = calculate_expanded_cart_pricing(&expanded);
        assert_eq!(pricing.bundle_discount, Decimal::ZERO);
        assert_eq!(pricing.regular_discount, Decimal::ZERO);
        assert_eq!(pricing.total, Decimal::from(3000));
    }

    #[test]
    fn test_total_clamped_at_zero() {
        // Malformed bundle data: discount far larger than what was charged
        let bundle: CartLineItem = serde_json::from_value(json!({
            "id": "b4",
            "type": "bundle",
            "title": "Broken Pack",
            "discount": 90,
            "originalPrice": 50000,
            "programs": [{"title": "Only", "price": 100}]
        }))
        .unwrap();
        let expanded = expand_bundles_for_checkout(&[bundle]);

        let clamped = calculate_expanded_cart_pricing(&expanded);
        assert_eq!(clamped.total, Decimal::ZERO);
        assert_eq!(clamped.total_discount, Decimal::from(45000));

        let policy = PricingPolicy {
            clamp_negative_total: false,
            ..PricingPolicy::default()
        };
        let unclamped = calculate_expanded_cart_pricing_with(&expanded, &policy);
        assert_eq!(unclamped.total, Decimal::from(-44900));
    }

    #[test]
    fn test_custom_regular_discount() {
        let expanded = expand_bundles_for_checkout(&[CartLineItem::simple("s1", "Class", Decimal::from(1000), "live")]);
        let policy = PricingPolicy {
            regular_discount_percent: Decimal::ZERO,
            clamp_negative_total: true,
        };

        let pricing = calculate_expanded_cart_pricing_with(&expanded, &policy);
        assert_eq!(pricing.total, Decimal::from(1000));
    }

    #[test]
    fn test_oversized_lines_saturate() {
        let huge = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let mut line = CartLineItem::simple("s1", "Class", huge, "live");
        line.persons = Some(u32::MAX);
        line.quantity = Some(u32::MAX);
        let mut bundle = three_pack();
        bundle.original_price = Some(Decimal::MAX);
        bundle.discount = Some(huge);

        let pricing = calculate_expanded_cart_pricing(&expand_bundles_for_checkout(&[line.clone(), line, bundle]));

        assert_eq!(pricing.subtotal, Decimal::MAX);
        assert!(pricing.total >= Decimal::ZERO);
        assert!(pricing.total_discount > Decimal::ZERO);
    }

    #[test]
    fn test_empty_cart_prices_to_zero() {
        let pricing = calculate_expanded_cart_pricing(&[]);
        assert_eq!(pricing.subtotal, Decimal::ZERO);
        assert_eq!(pricing.total, Decimal::ZERO);
        assert!(pricing.expanded_items.is_empty());
    }
}
