//! Payment record, one per order.
//!
//! Created when the gateway intent is opened and mutated exactly once, by
//! reconciliation on a verified callback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Created,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(order_id: Uuid, gateway_order_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id,
            gateway_order_id: gateway_order_id.into(),
            gateway_payment_id: None,
            gateway_signature: None,
            status: PaymentStatus::Created,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    /// Records the verified gateway confirmation.
    pub fn confirm(&mut self, payment_id: &str, signature: &str, at: DateTime<Utc>) {
        self.gateway_payment_id = Some(payment_id.to_string());
        self.gateway_signature = Some(signature.to_string());
        self.status = PaymentStatus::Paid;
        self.paid_at = Some(at);
    }
}
