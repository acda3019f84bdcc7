//! Payment gateway client (Razorpay-shaped REST) and signature
//! verification.
//!
//! Amounts cross the wire in minor units (paise), converted with
//! [`to_minor_units`]. Signatures are HMAC-SHA256 hex digests over
//! `"{gateway_order_id}|{gateway_payment_id}"` for checkout callbacks
//! and over the raw body for webhooks; both verify in constant time.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use marigold_core::to_minor_units;

use crate::config::PaymentConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("gateway error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Order total can't be expressed in minor units.
    #[error("amount not representable in minor units")]
    InvalidAmount,
}

/// Request body for opening a gateway order.
#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
}

/// A gateway order as returned by the payments API.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// A webhook delivery.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookPayment>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayment {
    pub entity: PaymentEntity,
}

/// The payment entity inside a webhook, reduced to what we use.
#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub order_id: Option<String>,
}

/// Payment gateway client.
#[derive(Clone)]
pub struct PaymentsClient {
    inner: Arc<PaymentsClientInner>,
}

struct PaymentsClientInner {
    client: reqwest::Client,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: SecretString,
    base_url: String,
}

impl PaymentsClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            inner: Arc::new(PaymentsClientInner {
                client,
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                webhook_secret: config.webhook_secret.clone(),
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// The public key id checkout clients need.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    /// Open a gateway order for `amount`, converted to minor units.
    /// The receipt is a fresh UUID so retried placements never collide.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidAmount` if the total can't be
    /// converted and `PaymentError::Api` when the gateway refuses.
    pub async fn create_order(&self, amount: Decimal) -> Result<GatewayOrder, PaymentError> {
        let minor = to_minor_units(amount).ok_or(PaymentError::InvalidAmount)?;
        let receipt = Uuid::new_v4().to_string();

        let body = CreateOrderBody {
            amount: minor,
            currency: "INR",
            receipt: &receipt,
            payment_capture: 1,
        };

        let url = format!("{}/orders", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .basic_auth(
                &self.inner.key_id,
                Some(self.inner.key_secret.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown gateway error".to_owned());

        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Verify a checkout callback signature over
    /// `"{gateway_order_id}|{gateway_payment_id}"`.
    #[must_use]
    pub fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        let message = format!("{gateway_order_id}|{gateway_payment_id}");
        signature_matches(
            self.inner.key_secret.expose_secret(),
            message.as_bytes(),
            signature,
        )
    }

    /// Verify a webhook signature over the raw request body.
    #[must_use]
    pub fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        signature_matches(self.inner.webhook_secret.expose_secret(), body, signature)
    }
}

/// Compute the hex HMAC-SHA256 signature of `message` under `secret`.
#[must_use]
pub fn sign(secret: &str, message: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature against the expected HMAC.
#[must_use]
pub fn signature_matches(secret: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trips() {
        let sig = sign("test_secret", b"order_abc|pay_xyz");
        assert!(signature_matches("test_secret", b"order_abc|pay_xyz", &sig));
    }

    #[test]
    fn tampered_message_fails() {
        let sig = sign("test_secret", b"order_abc|pay_xyz");
        assert!(!signature_matches(
            "test_secret",
            b"order_abc|pay_other",
            &sig
        ));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = sign("test_secret", b"order_abc|pay_xyz");
        assert!(!signature_matches(
            "another_secret",
            b"order_abc|pay_xyz",
            &sig
        ));
    }

    #[test]
    fn non_hex_signature_fails_closed() {
        assert!(!signature_matches("s", b"m", "not hex at all!"));
        assert!(!signature_matches("s", b"m", ""));
    }
}
