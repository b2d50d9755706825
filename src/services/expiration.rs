use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::models::common::SubscriptionType;
use crate::models::program::PurchasedProgram;

/// Programs this close to their expiration are flagged for renewal reminders.
pub const EXPIRING_SOON_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Lifetime,
    Active,
    ExpiringSoon,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    pub message: String,
    pub is_active: bool,
    pub days_remaining: Option<i64>,
}

/// Expiration instant for a purchase, `None` when it never expires.
///
/// Months are calendar months: a monthly purchase on Jan 31 expires on the
/// last day of February.
pub fn calculate_expiration_date(
    subscription_type: SubscriptionType,
    purchase_date: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let months = subscription_type.duration_months()?;
    purchase_date.checked_add_months(Months::new(months))
}

pub fn is_expired(expiration_date: Option<DateTime<Utc>>) -> bool {
    is_expired_at(expiration_date, Utc::now())
}

pub fn is_expired_at(expiration_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expiration_date {
        Some(expiration) => now > expiration,
        None => false,
    }
}

pub fn days_until_expiration(expiration_date: Option<DateTime<Utc>>) -> Option<i64> {
    days_until_expiration_at(expiration_date, Utc::now())
}

/// Whole days left, rounded up and never negative.
pub fn days_until_expiration_at(
    expiration_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<i64> {
    let remaining = expiration_date?.signed_duration_since(now);
    if remaining <= Duration::zero() {
        return Some(0);
    }

    let millis = remaining.num_milliseconds();
    Some((millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY)
}

pub fn subscription_status(program: &PurchasedProgram) -> SubscriptionStatus {
    subscription_status_at(program, Utc::now())
}

pub fn subscription_status_at(program: &PurchasedProgram, now: DateTime<Utc>) -> SubscriptionStatus {
    classify_expiration(program.expiration_date, now, EXPIRING_SOON_DAYS)
}

/// Lifetime, expired, expiring soon, then active, checked in that order.
pub fn classify_expiration(
    expiration_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    expiring_soon_days: i64,
) -> SubscriptionStatus {
    if expiration_date.is_none() {
        return SubscriptionStatus {
            kind: StatusKind::Lifetime,
            message: "Lifetime access".to_string(),
            is_active: true,
            days_remaining: None,
        };
    }

    if is_expired_at(expiration_date, now) {
        return SubscriptionStatus {
            kind: StatusKind::Expired,
            message: "Subscription expired".to_string(),
            is_active: false,
            days_remaining: Some(0),
        };
    }

    let days = days_until_expiration_at(expiration_date, now).unwrap_or(0);
    if days <= expiring_soon_days {
        let message = if days == 0 {
            "Expires today".to_string()
        } else {
            format!("Expires in {}", pluralize_days(days))
        };
        return SubscriptionStatus {
            kind: StatusKind::ExpiringSoon,
            message,
            is_active: true,
            days_remaining: Some(days),
        };
    }

    SubscriptionStatus {
        kind: StatusKind::Active,
        message: format!("{} remaining", pluralize_days(days)),
        is_active: true,
        days_remaining: Some(days),
    }
}

fn pluralize_days(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}
