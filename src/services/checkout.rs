use chrono::{DateTime, Utc};

use crate::models::cart::{CartLineItem, CheckoutLineItem, ExpandedLineItem};
use crate::models::checkout::{CheckoutForm, CheckoutPayload, CheckoutUser};
use crate::models::common::SubscriptionType;
use crate::services::cart::{
    calculate_expanded_cart_pricing_with, expand_bundles_for_checkout, PricingPolicy,
};
use crate::services::expiration::calculate_expiration_date;

pub const DEFAULT_CURRENCY: &str = "INR";

/// Options that shape a payload but are not part of the visitor's input.
#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    pub pricing: PricingPolicy,
    pub currency: String,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

pub fn prepare_checkout_data(
    cart: &[CartLineItem],
    form_data: &CheckoutForm,
    user: &CheckoutUser,
) -> CheckoutPayload {
    prepare_checkout_data_at(cart, form_data, user, &CheckoutOptions::default(), Utc::now())
}

/// Builds the order record for a cart. Every line shares the single
/// `purchase_date` instant so their expirations line up.
pub fn prepare_checkout_data_at(
    cart: &[CartLineItem],
    form_data: &CheckoutForm,
    user: &CheckoutUser,
    options: &CheckoutOptions,
    purchase_date: DateTime<Utc>,
) -> CheckoutPayload {
    let expanded = expand_bundles_for_checkout(cart);
    let pricing = calculate_expanded_cart_pricing_with(&expanded, &options.pricing);

    let expanded_cart_data = expanded
        .into_iter()
        .map(|item| stamp_line_item(item, purchase_date))
        .collect();

    CheckoutPayload {
        user_id: user.uid.clone(),
        email: user.email.clone(),
        name: form_data.full_name(),
        original_cart_data: cart.to_vec(),
        expanded_cart_data,
        pricing,
        form_data: form_data.clone(),
        purchase_date,
        timestamp: purchase_date.timestamp_millis(),
        currency: options.currency.clone(),
    }
}

fn stamp_line_item(item: ExpandedLineItem, purchase_date: DateTime<Utc>) -> CheckoutLineItem {
    let subscription_type = infer_subscription_type(&item);
    let expiration_date = calculate_expiration_date(subscription_type, purchase_date);

    CheckoutLineItem::stamp(item, subscription_type, purchase_date, expiration_date)
}

/// Bundle variant first, then an explicit subscription type, then a hint in
/// the item type, otherwise a one-time purchase.
pub fn infer_subscription_type(item: &ExpandedLineItem) -> SubscriptionType {
    if item.is_from_bundle {
        if let Some(variant) = &item.bundle_variant {
            return SubscriptionType::from_label(variant);
        }
    }

    if let Some(explicit) = &item.subscription_type {
        return SubscriptionType::from_label(explicit);
    }

    let item_type = item.item_type.to_ascii_lowercase();
    if item_type.contains("monthly") {
        SubscriptionType::Monthly
    } else if item_type.contains("quarterly") {
        SubscriptionType::Quarterly
    } else {
        SubscriptionType::OneTime
    }
}
