use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }
}

/// How long a purchased program stays accessible.
///
/// Any label we do not know deserializes to `Unrecognized`, which is treated
/// as never expiring so a data-entry gap cannot lock a paying customer out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionType {
    OneTime,
    Monthly,
    Quarterly,
    #[serde(other)]
    Unrecognized,
}

impl SubscriptionType {
    /// Parses a free-form label such as a bundle variant ("Monthly", "one-time").
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "onetime" | "one-time" | "one_time" => SubscriptionType::OneTime,
            "monthly" => SubscriptionType::Monthly,
            "quarterly" => SubscriptionType::Quarterly,
            _ => SubscriptionType::Unrecognized,
        }
    }

    /// Calendar months added to the purchase date, `None` for never-expiring kinds.
    pub fn duration_months(&self) -> Option<u32> {
        match self {
            SubscriptionType::Monthly => Some(1),
            SubscriptionType::Quarterly => Some(3),
            SubscriptionType::OneTime | SubscriptionType::Unrecognized => None,
        }
    }
}

impl Default for SubscriptionType {
    fn default() -> Self {
        SubscriptionType::OneTime
    }
}

impl std::fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionType::OneTime => write!(f, "oneTime"),
            SubscriptionType::Monthly => write!(f, "monthly"),
            SubscriptionType::Quarterly => write!(f, "quarterly"),
            SubscriptionType::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Rounds a money amount half-up to whole units, matching how the storefront
/// rounds promotional discounts.
pub fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a money amount half-up to paise.
pub fn round_paise(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount the way the storefront shows prices: `₹1,00,000` or
/// `₹2,900.50` (Indian digit grouping, paise only when non-zero).
pub fn format_inr(amount: Decimal) -> String {
    let rounded = round_paise(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();
    let whole = abs.trunc().normalize();
    let paise = ((abs - abs.trunc()) * Decimal::ONE_HUNDRED)
        .to_u32()
        .unwrap_or(0);

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('₹');
    out.push_str(&group_indian(&whole.to_string()));
    if paise > 0 {
        out.push_str(&format!(".{:02}", paise));
    }
    out
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
