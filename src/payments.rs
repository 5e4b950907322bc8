//! Payment lifecycle: opening gateway intents and reconciling verified
//! callbacks into order/payment state.
//!
//! Reconciliation order is fixed: verify the signature first (zero store
//! access on a mismatch), then look up the order by its gateway reference,
//! then commit the paid transition as one conditional unit. The notifier
//! only fires on a fresh transition, and its failures never roll back or
//! mask the committed payment.

use crate::domain::ports::{MarkPaid, Notifier, OrderStore};
use crate::error::{CommerceError, Result};
use crate::gateway::{CallbackPayload, RazorpayGateway};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// What the web layer renders into the gateway's browser checkout.
#[derive(Clone, Debug, Serialize)]
pub struct PaymentSession {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order transitioned to paid in this call.
    Applied,
    /// Duplicate callback for an already-paid order; nothing changed.
    AlreadyPaid,
}

#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<dyn OrderStore>,
    gateway: RazorpayGateway,
    notifier: Arc<dyn Notifier>,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        gateway: RazorpayGateway,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            orders,
            gateway,
            notifier,
        }
    }

    /// Opens a gateway intent for the order and records the Payment row.
    /// A repeat call returns the already-recorded intent, keeping the
    /// order/payment relationship one-to-one. On `GatewayUnavailable`
    /// nothing is recorded.
    pub async fn start_payment(&self, order_id: Uuid) -> Result<PaymentSession> {
        let order = self
            .orders
            .order(order_id)
            .await?
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))?;
        let amount_minor = order.total_price.minor_units().ok_or_else(|| {
            CommerceError::Storage(format!("order {order_id} total not representable in minor units"))
        })?;

        if let Some(existing) = self.orders.payment_for_order(order_id).await? {
            return Ok(PaymentSession {
                order_id,
                gateway_order_id: existing.gateway_order_id,
                amount_minor,
                currency: order.total_price.currency().to_string(),
                key_id: self.gateway.key_id().to_string(),
            });
        }

        let intent = self.gateway.open_intent(&order).await?;
        self.orders
            .record_intent(order_id, &intent.gateway_order_id)
            .await?;
        tracing::info!(%order_id, gateway_order_id = %intent.gateway_order_id, "payment intent opened");

        Ok(PaymentSession {
            order_id,
            gateway_order_id: intent.gateway_order_id,
            amount_minor: intent.amount_minor,
            currency: intent.currency,
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Consumes a gateway callback that has already been extracted into a
    /// typed payload.
    pub async fn reconcile(&self, payload: &CallbackPayload) -> Result<ReconcileOutcome> {
        if let Err(e) = self.gateway.verify_callback(payload) {
            tracing::warn!("rejecting callback with invalid signature");
            return Err(e);
        }

        let outcome = self
            .orders
            .mark_paid(
                &payload.razorpay_order_id,
                &payload.razorpay_payment_id,
                &payload.razorpay_signature,
                Utc::now(),
            )
            .await;

        match outcome {
            Ok(MarkPaid::Applied { order, payment }) => {
                tracing::info!(order_id = %order.id, gateway_payment_id = %payload.razorpay_payment_id, "payment reconciled");
                // Fire-and-forget relative to the committed transaction.
                if let Err(e) = self.notifier.order_confirmed(&order).await {
                    tracing::warn!(order_id = %order.id, error = %e, "order confirmation mail failed");
                }
                if let Err(e) = self.notifier.payment_confirmed(&order, &payment).await {
                    tracing::warn!(order_id = %order.id, error = %e, "payment confirmation mail failed");
                }
                Ok(ReconcileOutcome::Applied)
            }
            Ok(MarkPaid::AlreadyPaid { order }) => {
                tracing::info!(order_id = %order.id, "duplicate callback for paid order ignored");
                Ok(ReconcileOutcome::AlreadyPaid)
            }
            Err(e) => {
                if matches!(e, CommerceError::OrderNotFound(_)) {
                    tracing::warn!(gateway_order_id = %payload.razorpay_order_id, "callback for unknown order");
                }
                Err(e)
            }
        }
    }
}
