//! Order and its immutable line items.
//!
//! An order is created exactly once per checkout, from a snapshot of cart
//! contents and catalog prices at that instant. Unit prices are copied onto
//! the items, so the historical total never changes even if catalog prices
//! do. The paid state is a single trio kept in lockstep: `is_paid`,
//! `status == Paid` (or downstream), and `paid_at.is_some()`.

use crate::domain::value_objects::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// True for `paid` and every status downstream of it.
    pub fn is_paid_or_later(&self) -> bool {
        matches!(self, Self::Paid | Self::Shipped | Self::Delivered)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub total_price: Money,
    pub status: OrderStatus,
    pub is_paid: bool,
    /// The gateway's order id once a payment intent has been opened.
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(user_id: Uuid, user_email: impl Into<String>, total_price: Money) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            user_email: user_email.into(),
            total_price,
            status: OrderStatus::Pending,
            is_paid: false,
            payment_reference: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    /// Transitions pending -> paid, moving all three paid fields together.
    pub fn mark_paid(&mut self, at: DateTime<Utc>) {
        self.is_paid = true;
        self.status = OrderStatus::Paid;
        self.paid_at = Some(at);
    }

    /// The paid trio must agree; anything else is a corrupted row.
    pub fn paid_state_consistent(&self) -> bool {
        self.is_paid == self.status.is_paid_or_later() && self.is_paid == self.paid_at.is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    /// Catalog price at order-creation time. Never re-read afterwards.
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    pub fn new(order_id: Uuid, product_id: Uuid, unit_price: Money, quantity: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            order_id,
            product_id,
            unit_price,
            quantity,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_order_is_unpaid_and_consistent() {
        let order = Order::new(Uuid::now_v7(), "a@b.in", Money::new(dec!(250.00), "INR"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert!(order.paid_at.is_none());
        assert!(order.paid_state_consistent());
    }

    #[test]
    fn mark_paid_moves_the_trio_together() {
        let mut order = Order::new(Uuid::now_v7(), "a@b.in", Money::new(dec!(250.00), "INR"));
        let at = Utc::now();
        order.mark_paid(at);
        assert!(order.is_paid);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.paid_at, Some(at));
        assert!(order.paid_state_consistent());
    }

    #[test]
    fn item_line_total() {
        let item = OrderItem::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            Money::new(dec!(100.00), "INR"),
            2,
        );
        assert_eq!(item.line_total().amount(), dec!(200.00));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("refunded"), None);
    }
}
