//! Razorpay gateway adapter: remote payment intents and callback
//! signature verification.
//!
//! `verify_callback` is the sole trust boundary for marking an order paid.
//! It runs before any store lookup or mutation, and a mismatch is treated
//! as a potentially forged callback, never silently accepted.

use crate::domain::aggregates::Order;
use crate::error::{CommerceError, Result};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// A remote, provider-side placeholder for a payment.
#[derive(Clone, Debug)]
pub struct GatewayIntent {
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Callback fields, extracted once at the boundary. The gateway posts
/// either a form-encoded or a JSON body; both carry the same three fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl CallbackPayload {
    pub fn from_body(content_type: Option<&str>, body: &[u8]) -> Result<Self> {
        let is_json = content_type.is_some_and(|ct| ct.contains("json"));
        if is_json {
            serde_json::from_slice(body)
                .map_err(|e| CommerceError::Validation(format!("malformed callback body: {e}")))
        } else {
            serde_urlencoded::from_bytes(body)
                .map_err(|e| CommerceError::Validation(format!("malformed callback body: {e}")))
        }
    }
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    payment_capture: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
}

#[derive(Clone)]
pub struct RazorpayGateway {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayGateway {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CommerceError::GatewayUnavailable(e.to_string()))?;
        Ok(Self {
            http,
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Opens a remote payment intent for the order total, in integer minor
    /// units. Network errors, timeouts, and non-2xx responses all surface
    /// as `GatewayUnavailable`; the caller must not record a Payment then.
    pub async fn open_intent(&self, order: &Order) -> Result<GatewayIntent> {
        let amount = order.total_price.minor_units().ok_or_else(|| {
            CommerceError::Storage(format!(
                "order {} total not representable in minor units",
                order.id
            ))
        })?;
        let currency = order.total_price.currency().to_string();

        let response = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderBody {
                amount,
                currency: &currency,
                payment_capture: "1",
            })
            .send()
            .await
            .map_err(|e| CommerceError::GatewayUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CommerceError::GatewayUnavailable(format!(
                "gateway returned {status}"
            )));
        }
        let created: CreateOrderResponse = response
            .json()
            .await
            .map_err(|e| CommerceError::GatewayUnavailable(e.to_string()))?;

        Ok(GatewayIntent {
            gateway_order_id: created.id,
            amount_minor: amount,
            currency,
        })
    }

    /// Verifies the HMAC-SHA256 signature over `"{order_id}|{payment_id}"`
    /// keyed by the gateway secret. The comparison is constant-time.
    pub fn verify_callback(&self, payload: &CallbackPayload) -> Result<()> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| CommerceError::SignatureInvalid)?;
        mac.update(
            format!(
                "{}|{}",
                payload.razorpay_order_id, payload.razorpay_payment_id
            )
            .as_bytes(),
        );
        let provided =
            hex::decode(&payload.razorpay_signature).map_err(|_| CommerceError::SignatureInvalid)?;
        mac.verify_slice(&provided)
            .map_err(|_| CommerceError::SignatureInvalid)
    }
}

/// Computes the signature the gateway would attach to a callback. Test
/// helper shared with the integration suite.
pub fn sign_callback(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
