//! Payment gateway integration (Stripe-compatible checkout API)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use utoipa::ToSchema;

use crate::{
    config::StripeConfig,
    error::{AppError, AppResult},
};

/// Checkout session creation parameters
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    /// Correlation token echoed back by the gateway webhook
    pub client_reference_id: String,
    pub product_name: String,
    pub product_description: String,
    pub amount: Decimal,
    pub currency: String,
}

/// A created checkout session; `url` is where the client is redirected to pay
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// A processed refund
#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: String,
}

/// Parsed webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: CheckoutSessionObject,
}

/// Checkout session payload carried by a `checkout.session.completed` event
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

/// Payment gateway collaborator.
///
/// Webhook delivery is at-least-once; callers are responsible for applying
/// events idempotently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession>;

    async fn create_refund(&self, transaction_id: &str, reason: &str) -> AppResult<Refund>;

    /// Authenticate and parse a webhook delivery; no side effects on failure
    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> AppResult<WebhookEvent>;
}

/// Stripe implementation over the form-encoded HTTP API
pub struct StripeGateway {
    http: reqwest::Client,
    config: StripeConfig,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn unix_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession> {
        // The gateway bills in the currency's smallest unit
        let unit_amount = (request.amount * Decimal::from(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| {
                AppError::Gateway(format!("Amount {} not representable in cents", request.amount))
            })?;

        let params = [
            ("payment_method_types[]", "card".to_string()),
            ("mode", "payment".to_string()),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
            ("customer_email", request.customer_email),
            ("client_reference_id", request.client_reference_id),
            ("line_items[0][price_data][currency]", request.currency),
            (
                "line_items[0][price_data][unit_amount]",
                unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.product_name,
            ),
            (
                "line_items[0][price_data][product_data][description]",
                request.product_description,
            ),
            ("line_items[0][quantity]", "1".to_string()),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Checkout session request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Checkout session creation failed ({}): {}",
                status, body
            )));
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid checkout session response: {}", e)))
    }

    async fn create_refund(&self, transaction_id: &str, reason: &str) -> AppResult<Refund> {
        let params = [
            ("payment_intent", transaction_id),
            ("reason", reason),
        ];

        let response = self
            .http
            .post(format!("{}/v1/refunds", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Refund request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "Refund failed ({}): {}",
                status, body
            )));
        }

        response
            .json::<Refund>()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid refund response: {}", e)))
    }

    fn verify_webhook(&self, payload: &[u8], signature_header: &str) -> AppResult<WebhookEvent> {
        verify_signature(
            &self.config.webhook_secret,
            payload,
            signature_header,
            Self::unix_now(),
            self.config.signature_tolerance_secs,
        )?;

        serde_json::from_slice(payload)
            .map_err(|e| AppError::Gateway(format!("Malformed webhook payload: {}", e)))
    }
}

/// Check a `t=<ts>,v1=<hex>` signature header against the raw payload.
///
/// The signed message is `"<ts>.<payload>"`, authenticated with
/// HMAC-SHA256 under the webhook secret.
fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: u64,
    tolerance_secs: u64,
) -> AppResult<()> {
    let mut timestamp: Option<u64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::Gateway("Missing signature timestamp".to_string()))?;

    if candidates.is_empty() {
        return Err(AppError::Gateway("Missing v1 signature".to_string()));
    }

    if now.abs_diff(timestamp) > tolerance_secs {
        return Err(AppError::Gateway("Signature timestamp outside tolerance".to_string()));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Gateway("Invalid webhook secret".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if candidates.iter().any(|candidate| *candidate == expected) {
        Ok(())
    } else {
        Err(AppError::Gateway("Signature mismatch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const TOLERANCE: u64 = 300;

    fn sign(secret: &str, timestamp: u64, payload: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_a_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(SECRET, 1_700_000_000, payload);
        assert!(verify_signature(SECRET, payload, &header, 1_700_000_000, TOLERANCE).is_ok());
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(SECRET, 1_700_000_000, payload);
        let tampered = br#"{"type":"checkout.session.expired"}"#;
        assert!(verify_signature(SECRET, tampered, &header, 1_700_000_000, TOLERANCE).is_err());
    }

    #[test]
    fn rejects_the_wrong_secret() {
        let payload = b"{}";
        let header = sign("whsec_other", 1_700_000_000, payload);
        assert!(verify_signature(SECRET, payload, &header, 1_700_000_000, TOLERANCE).is_err());
    }

    #[test]
    fn rejects_a_stale_timestamp() {
        let payload = b"{}";
        let header = sign(SECRET, 1_700_000_000, payload);
        let much_later = 1_700_000_000 + TOLERANCE + 1;
        assert!(verify_signature(SECRET, payload, &header, much_later, TOLERANCE).is_err());
    }

    #[test]
    fn rejects_a_header_without_signature() {
        assert!(verify_signature(SECRET, b"{}", "t=1700000000", 1_700_000_000, TOLERANCE).is_err());
        assert!(verify_signature(SECRET, b"{}", "", 1_700_000_000, TOLERANCE).is_err());
    }

    #[test]
    fn parses_a_checkout_completed_event() {
        let payload = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_1",
                    "client_reference_id": "9f8a2d1c-5b27-4a7e-9e31-0c6a1e2b3d4f",
                    "payment_intent": "pi_42"
                }
            }
        }"#;
        let event: WebhookEvent = serde_json::from_slice(payload).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(
            event.data.object.client_reference_id.as_deref(),
            Some("9f8a2d1c-5b27-4a7e-9e31-0c6a1e2b3d4f")
        );
        assert_eq!(event.data.object.payment_intent.as_deref(), Some("pi_42"));
    }
}
