use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

use crate::config::OrderServiceConfig;
use crate::models::checkout::CheckoutPayload;
use crate::models::common::format_inr;

type HmacSha256 = Hmac<Sha256>;

const BASE_BACKOFF_MS: u64 = 200;
const MAX_BACKOFF_MS: u64 = 5_000;

/// What the order backend answers once it has accepted a checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_url: Option<String>,
}

/// Client for the external order-creation backend, which owns the payment
/// gateway conversation.
#[derive(Clone)]
pub struct OrderServiceClient {
    client: Client,
    config: OrderServiceConfig,
}

impl OrderServiceClient {
    pub fn new(config: OrderServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Hex HMAC-SHA256 of a request body under the shared secret.
    pub fn sign_payload(&self, body: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.signing_secret.as_bytes())
            .map_err(|e| anyhow!("Invalid signing secret: {}", e))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Checks a signature sent by the order backend on its callbacks.
    pub fn validate_signature(&self, body: &[u8], signature: &str) -> bool {
        let expected = match hex::decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let mut mac = match HmacSha256::new_from_slice(self.config.signing_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };

        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }

    /// Hands a checkout payload to the order backend.
    ///
    /// Transport failures and 5xx answers are retried with exponential
    /// backoff under one idempotency key; 4xx answers are returned at once.
    pub async fn submit_order(&self, payload: &CheckoutPayload) -> Result<OrderConfirmation> {
        let body = serde_json::to_vec(payload)?;
        let signature = self.sign_payload(&body)?;
        let idempotency_key = format!("ORD_{}", Uuid::new_v4().simple());
        let url = format!("{}/orders", self.config.base_url.trim_end_matches('/'));

        log::info!(
            "Submitting order {} for user {}: {} ({} lines)",
            idempotency_key,
            payload.user_id,
            format_inr(payload.pricing.total),
            payload.expanded_cart_data.len()
        );
        log::debug!("Order signature: {}", signature);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let retries_left = attempt <= self.config.max_retries;

            let result = self
                .client
                .post(&url)
                .header("content-type", "application/json")
                .header("X-Signature", &signature)
                .header("X-Idempotency-Key", &idempotency_key)
                .body(body.clone())
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let confirmation: OrderConfirmation = response.json().await?;
                    log::info!(
                        "Order {} accepted for {} {}",
                        confirmation.order_id,
                        confirmation.amount,
                        confirmation.currency
                    );
                    return Ok(confirmation);
                }
                Ok(response) if response.status().is_server_error() && retries_left => {
                    log::warn!(
                        "Order service returned {} on attempt {}, retrying",
                        response.status(),
                        attempt
                    );
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response.text().await.unwrap_or_default();
                    log::error!("Order service rejected {}: {} {}", idempotency_key, status, error_text);
                    return Err(anyhow!("Order service error ({}): {}", status, error_text));
                }
                Err(e) if retries_left => {
                    log::warn!("Order service unreachable on attempt {}: {}, retrying", attempt, e);
                }
                Err(e) => {
                    log::error!("Order service unreachable after {} attempts: {}", attempt, e);
                    return Err(e.into());
                }
            }

            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
}

/// Delay before the retry that follows `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let millis = BASE_BACKOFF_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(millis.min(MAX_BACKOFF_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checkout::{CheckoutForm, CheckoutUser};
    use crate::models::cart::CartLineItem;
    use crate::services::checkout::prepare_checkout_data;
    use serde_json::Map;

    fn create_test_config(base_url: &str) -> OrderServiceConfig {
        OrderServiceConfig {
            base_url: base_url.to_string(),
            signing_secret: "test_secret".to_string(),
            timeout_secs: 1,
            max_retries: 0,
        }
    }

    #[test]
    fn test_signature_round_trip() {
        let client = OrderServiceClient::new(create_test_config("http://localhost")).unwrap();
        let body = br#"{"userId":"u1"}"#;

        let signature = client.sign_payload(body).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(client.validate_signature(body, &signature));
        assert!(!client.validate_signature(b"tampered", &signature));
        assert!(!client.validate_signature(body, "not-hex"));
    }

    #[test]
    fn test_signature_matches_plain_hmac() {
        let client = OrderServiceClient::new(create_test_config("http://localhost")).unwrap();
        let body = b"payload";

        let mut mac = HmacSha256::new_from_slice(b"test_secret").unwrap();
        mac.update(body);
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(client.sign_payload(body).unwrap(), expected);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(3), Duration::from_millis(800));
        assert_eq!(backoff_delay(10), Duration::from_millis(MAX_BACKOFF_MS));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(MAX_BACKOFF_MS));
    }

    #[test]
    fn test_confirmation_parsing() {
        let confirmation: OrderConfirmation = serde_json::from_str(
            r#"{"orderId":"order_123","amount":2900,"currency":"INR","paymentUrl":"https://pay.example.com/o/123"}"#,
        )
        .unwrap();

        assert_eq!(confirmation.order_id, "order_123");
        assert_eq!(confirmation.amount, Decimal::from(2900));
        assert_eq!(confirmation.status, None);
    }

    #[tokio::test]
    async fn test_unreachable_service_errors() {
        let client = OrderServiceClient::new(create_test_config("http://127.0.0.1:9")).unwrap();
        let form = CheckoutForm {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            email: None,
            phone: None,
            extra: Map::new(),
        };
        let user = CheckoutUser {
            uid: "u1".to_string(),
            email: "test@example.com".to_string(),
        };
        let cart = vec![CartLineItem::simple("s1", "Class", Decimal::from(100), "live")];
        let payload = prepare_checkout_data(&cart, &form, &user);

        assert!(client.submit_order(&payload).await.is_err());
    }
}
