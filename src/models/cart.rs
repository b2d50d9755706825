use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::common::SubscriptionType;

pub const BUNDLE_ITEM_TYPE: &str = "bundle";

/// Keys that describe where an expanded line came from. Only the expander
/// sets them; copies carried on incoming items or stubs are dropped.
pub const PROVENANCE_KEYS: [&str; 8] = [
    "isFromBundle",
    "originalBundleId",
    "bundleId",
    "bundleVariant",
    "bundleName",
    "bundleDiscount",
    "bundleTotalPrice",
    "bundleProgramCount",
];

/// Keys written when a line is stamped at checkout.
pub const STAMPED_KEYS: [&str; 4] = ["subscriptionType", "purchaseDate", "expirationDate", "isExpired"];

/// An entry in the pre-checkout cart, either a single program or a bundle
/// wrapping several programs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,

    // Bundle-only fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub programs: Vec<ProgramStub>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Bundle discount in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartLineItem {
    pub fn simple(id: &str, title: &str, price: Decimal, item_type: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            price: Some(price),
            item_type: item_type.to_string(),
            persons: None,
            quantity: None,
            image: None,
            subscription_type: None,
            programs: Vec::new(),
            variant: None,
            discount: None,
            original_price: None,
            bundle_id: None,
            extra: Map::new(),
        }
    }

    pub fn is_bundle(&self) -> bool {
        self.item_type == BUNDLE_ITEM_TYPE
    }

    /// A bundle can only be expanded when it actually lists programs.
    pub fn is_expandable_bundle(&self) -> bool {
        self.is_bundle() && !self.programs.is_empty()
    }
}

/// A program referenced by a bundle, carrying its own price for attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgramStub {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub program_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One line per underlying program after bundles have been expanded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedLineItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default)]
    pub is_from_bundle: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_total_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_program_count: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExpandedLineItem {
    pub fn unit_price(&self) -> Decimal {
        self.price.unwrap_or(Decimal::ZERO)
    }

    pub fn persons_or_default(&self) -> u32 {
        self.persons.unwrap_or(1)
    }

    pub fn quantity_or_default(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }

    /// `price × persons × quantity` with fail-soft defaults. Saturates at
    /// `Decimal::MAX` instead of overflowing.
    pub fn line_total(&self) -> Decimal {
        self.unit_price()
            .saturating_mul(Decimal::from(self.persons_or_default()))
            .saturating_mul(Decimal::from(self.quantity_or_default()))
    }
}

impl From<CartLineItem> for ExpandedLineItem {
    /// Pass-through conversion for items that are not expanded.
    fn from(item: CartLineItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            price: item.price,
            item_type: item.item_type,
            persons: item.persons,
            quantity: item.quantity,
            image: item.image,
            subscription_type: item.subscription_type,
            variant: item.variant,
            is_from_bundle: false,
            original_bundle_id: None,
            bundle_id: item.bundle_id,
            bundle_variant: None,
            bundle_name: None,
            bundle_discount: None,
            bundle_total_price: None,
            bundle_program_count: None,
            extra: passthrough_extra(item.programs, item.discount, item.original_price, item.extra),
        }
    }
}

// Bundle-shaped fields that are not part of the expanded layout are kept
// alongside the other unknown fields so a pass-through item loses nothing.
fn passthrough_extra(
    programs: Vec<ProgramStub>,
    discount: Option<Decimal>,
    original_price: Option<Decimal>,
    mut extra: Map<String, Value>,
) -> Map<String, Value> {
    for key in PROVENANCE_KEYS {
        extra.remove(key);
    }
    if !programs.is_empty() {
        if let Ok(value) = serde_json::to_value(programs) {
            extra.insert("programs".to_string(), value);
        }
    }
    if let Some(discount) = discount.and_then(|d| serde_json::to_value(d).ok()) {
        extra.insert("discount".to_string(), discount);
    }
    if let Some(price) = original_price.and_then(|p| serde_json::to_value(p).ok()) {
        extra.insert("originalPrice".to_string(), price);
    }
    extra
}

/// An expanded line stamped with its subscription terms at checkout.
///
/// Build it with [`CheckoutLineItem::stamp`] so the flattened item cannot
/// repeat a stamped key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineItem {
    #[serde(flatten)]
    pub item: ExpandedLineItem,
    pub subscription_type: SubscriptionType,
    pub purchase_date: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_expired: bool,
}

impl CheckoutLineItem {
    pub fn stamp(
        mut item: ExpandedLineItem,
        subscription_type: SubscriptionType,
        purchase_date: DateTime<Utc>,
        expiration_date: Option<DateTime<Utc>>,
    ) -> Self {
        item.subscription_type = None;
        for key in STAMPED_KEYS {
            item.extra.remove(key);
        }

        Self {
            item,
            subscription_type,
            purchase_date,
            expiration_date,
            is_expired: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartPricing {
    pub subtotal: Decimal,
    pub bundle_discount: Decimal,
    pub regular_discount: Decimal,
    pub total_discount: Decimal,
    pub total: Decimal,
    pub expanded_items: Vec<ExpandedLineItem>,
}
