//! Seams to external collaborators: catalog, order/payment persistence,
//! and the notifier.

use crate::domain::aggregates::{Order, OrderItem, Payment, Product};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
    async fn list_in_stock(&self) -> Result<Vec<Product>>;
    async fn insert_product(&self, product: Product) -> Result<()>;

    /// Conditional compare-and-decrement. Fails with `InsufficientStock`
    /// (and changes nothing) when fewer than `qty` units remain; two
    /// concurrent decrements for the last unit cannot both succeed.
    async fn decrement_stock(&self, product_id: Uuid, qty: u32) -> Result<()>;

    /// Restock, used to compensate a partially-failed checkout.
    async fn increment_stock(&self, product_id: Uuid, qty: u32) -> Result<()>;
}

/// Outcome of the atomic mark-paid unit.
#[derive(Clone, Debug)]
pub enum MarkPaid {
    /// The order transitioned pending -> paid in this call.
    Applied { order: Order, payment: Payment },
    /// The order was already paid; nothing changed.
    AlreadyPaid { order: Order },
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order and all of its items as one unit.
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()>;

    async fn order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;

    /// Records an opened gateway intent: creates the Payment row and stamps
    /// the order's `payment_reference`, atomically.
    async fn record_intent(&self, order_id: Uuid, gateway_order_id: &str) -> Result<Payment>;

    async fn payment_for_order(&self, order_id: Uuid) -> Result<Option<Payment>>;

    /// The reconciliation commit: conditionally transitions the order to
    /// paid and upserts its Payment (creating the row if it is missing),
    /// both stamped with the same `at`. An already-paid order degrades to
    /// `AlreadyPaid` without touching anything, which makes duplicate and
    /// concurrent gateway callbacks safe.
    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkPaid>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_confirmed(&self, order: &Order) -> Result<()>;
    async fn payment_confirmed(&self, order: &Order, payment: &Payment) -> Result<()>;
}
