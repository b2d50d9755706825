use chrono::{DateTime, Utc};

use crate::models::program::PurchasedProgram;
use crate::services::expiration::is_expired_at;

/// Programs still accessible: never-expiring ones plus those not yet past
/// their expiration date. Input order is kept.
pub fn filter_expired_subscriptions(programs: &[PurchasedProgram]) -> Vec<PurchasedProgram> {
    filter_expired_subscriptions_at(programs, Utc::now())
}

pub fn filter_expired_subscriptions_at(
    programs: &[PurchasedProgram],
    now: DateTime<Utc>,
) -> Vec<PurchasedProgram> {
    programs
        .iter()
        .filter(|program| !is_expired_at(program.expiration_date, now))
        .cloned()
        .collect()
}

/// Programs whose expiration date has passed. Input order is kept.
pub fn get_expired_subscriptions(programs: &[PurchasedProgram]) -> Vec<PurchasedProgram> {
    get_expired_subscriptions_at(programs, Utc::now())
}

pub fn get_expired_subscriptions_at(
    programs: &[PurchasedProgram],
    now: DateTime<Utc>,
) -> Vec<PurchasedProgram> {
    programs
        .iter()
        .filter(|program| is_expired_at(program.expiration_date, now))
        .cloned()
        .collect()
}

/// Splits programs into `(active, expired)` in one pass.
pub fn partition_subscriptions_at(
    programs: &[PurchasedProgram],
    now: DateTime<Utc>,
) -> (Vec<PurchasedProgram>, Vec<PurchasedProgram>) {
    programs
        .iter()
        .cloned()
        .partition(|program| !is_expired_at(program.expiration_date, now))
}

/// Recomputes the `is_expired` cache and returns the ids whose flag changed.
pub fn refresh_expiration_flags(programs: &mut [PurchasedProgram], now: DateTime<Utc>) -> Vec<String> {
    let mut changed = Vec::new();
    for program in programs.iter_mut() {
        let expired = is_expired_at(program.expiration_date, now);
        if program.is_expired != expired {
            program.is_expired = expired;
            changed.push(program.id.clone());
        }
    }
    changed
}
