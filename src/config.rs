use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;

use crate::services::cart::PricingPolicy;
use crate::services::checkout::{CheckoutOptions, DEFAULT_CURRENCY};
use crate::services::expiration::EXPIRING_SOON_DAYS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub order_service: OrderServiceConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderServiceConfig {
    pub base_url: String,
    pub signing_secret: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub expiring_soon_days: i64,
    pub regular_discount_percent: Decimal,
    pub clamp_negative_total: bool,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "memory://".to_string()),

            port: parse_or("PORT", 8080),

            order_service: OrderServiceConfig {
                base_url: env::var("ORDER_SERVICE_URL")?,
                signing_secret: env::var("ORDER_SERVICE_SECRET")?,
                timeout_secs: parse_or("ORDER_SERVICE_TIMEOUT_SECS", 10),
                max_retries: parse_or("ORDER_SERVICE_MAX_RETRIES", 3),
            },

            app: AppConfig {
                expiring_soon_days: parse_or("EXPIRING_SOON_DAYS", EXPIRING_SOON_DAYS),
                regular_discount_percent: parse_or("REGULAR_DISCOUNT_PERCENT", Decimal::from(20)),
                clamp_negative_total: parse_or("CLAMP_NEGATIVE_TOTAL", true),
                currency: env::var("CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Invalid {} value {:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            regular_discount_percent: self.regular_discount_percent,
            clamp_negative_total: self.clamp_negative_total,
        }
    }

    pub fn checkout_options(&self) -> CheckoutOptions {
        CheckoutOptions {
            pricing: self.pricing_policy(),
            currency: self.currency.clone(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            expiring_soon_days: EXPIRING_SOON_DAYS,
            regular_discount_percent: Decimal::from(20),
            clamp_negative_total: true,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}
