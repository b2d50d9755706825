use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::models::cart::{CartLineItem, CartPricing, CheckoutLineItem};

/// The signed-in visitor, as handed over by the OTP provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutUser {
    pub uid: String,
    pub email: String,
}

/// Contact details entered on the checkout page.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[validate(custom = "validate_phone")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckoutForm {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    // Optional +country prefix, then 10 to 12 digits; spaces and dashes allowed
    let pattern = Regex::new(r"^\+?[0-9][0-9 \-]{8,14}[0-9]$")
        .map_err(|_| ValidationError::new("phone_pattern"))?;
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();

    if pattern.is_match(phone) && (10..=12).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone"))
    }
}

/// Record handed to the order-creation backend once the visitor confirms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub original_cart_data: Vec<CartLineItem>,
    pub expanded_cart_data: Vec<CheckoutLineItem>,
    pub pricing: CartPricing,
    pub form_data: CheckoutForm,
    pub purchase_date: DateTime<Utc>,
    /// Purchase instant in epoch milliseconds.
    pub timestamp: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub cart: Vec<CartLineItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub cart: Vec<CartLineItem>,
    pub form_data: CheckoutForm,
    pub user: CheckoutUser,
}
