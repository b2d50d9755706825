use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::cart::CheckoutLineItem;
use crate::models::common::SubscriptionType;

/// A program a user owns, as persisted in the document store after payment.
///
/// `expiration_date` is derived once at purchase and never recomputed;
/// `is_expired` is only a cache and may be stale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedProgram {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub program_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub subscription_type: SubscriptionType,
    pub purchase_date: DateTime<Utc>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_expired: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,

    // Slot booking, shape depends on the program type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_slots: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    // Bundle provenance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_variant: Option<String>,
    #[serde(default)]
    pub is_from_bundle: bool,
}

impl PurchasedProgram {
    /// Projects a stamped checkout line into the record kept after payment.
    ///
    /// Slot metadata and category travel as free-form fields on the cart line,
    /// so the projection goes through the JSON shape both records share.
    pub fn from_checkout_item(item: &CheckoutLineItem) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(item)?;
        let mut program: PurchasedProgram = serde_json::from_value(value)?;
        if program.bundle_id.is_none() {
            program.bundle_id = item.item.original_bundle_id.clone();
        }
        Ok(program)
    }

    pub fn never_expires(&self) -> bool {
        self.expiration_date.is_none()
    }
}
