//! Confirmation email notifiers.
//!
//! Both implementations are fire-and-forget from the reconciliation
//! engine's point of view: the caller logs and swallows any error here.

use crate::domain::aggregates::{Order, Payment};
use crate::domain::ports::Notifier;
use crate::error::{CommerceError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Bound on one mail call; a hung provider must not stall the callback
/// response for a payment that is already committed.
const MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends transactional mail through Brevo's HTTP API.
#[derive(Clone)]
pub struct BrevoNotifier {
    http: reqwest::Client,
    api_key: String,
    sender: String,
    base_url: String,
}

impl BrevoNotifier {
    pub fn new(api_key: impl Into<String>, sender: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, sender, "https://api.brevo.com", MAIL_TIMEOUT)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        sender: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CommerceError::Notification(e.to_string()))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            sender: sender.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "sender": { "email": self.sender },
            "to": [{ "email": to }],
            "subject": subject,
            "textContent": text,
        });
        let response = self
            .http
            .post(format!("{}/v3/smtp/email", self.base_url))
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CommerceError::Notification(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CommerceError::Notification(format!(
                "mail provider returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for BrevoNotifier {
    async fn order_confirmed(&self, order: &Order) -> Result<()> {
        let subject = format!("Order Confirmation #{} - Thank you for your purchase!", order.id);
        let text = format!(
            "Your order #{} for {} has been received and confirmed.",
            order.id, order.total_price
        );
        self.send(&order.user_email, &subject, &text).await
    }

    async fn payment_confirmed(&self, order: &Order, payment: &Payment) -> Result<()> {
        let subject = format!("Payment Confirmed - Order #{}", order.id);
        let text = format!(
            "Your payment of {} for order #{} is confirmed. Payment reference: {}.",
            order.total_price,
            order.id,
            payment.gateway_payment_id.as_deref().unwrap_or("n/a"),
        );
        self.send(&order.user_email, &subject, &text).await
    }
}

/// Tracing-only notifier, used when no mail provider is configured and as
/// the default in tests.
#[derive(Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_confirmed(&self, order: &Order) -> Result<()> {
        tracing::info!(order_id = %order.id, email = %order.user_email, "order confirmation (log only)");
        Ok(())
    }

    async fn payment_confirmed(&self, order: &Order, payment: &Payment) -> Result<()> {
        tracing::info!(
            order_id = %order.id,
            payment_id = %payment.id,
            email = %order.user_email,
            "payment confirmation (log only)"
        );
        Ok(())
    }
}
