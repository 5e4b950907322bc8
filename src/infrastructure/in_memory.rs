//! In-memory store implementing both the catalog and order-store ports.
//!
//! The default backend when no `DATABASE_URL` is configured, and the backend
//! every test runs against. All state sits behind a single `RwLock`, so each
//! port operation holds one write guard for its whole unit: the conditional
//! stock decrement and the conditional mark-paid are atomic by construction.

use crate::domain::aggregates::{Order, OrderItem, Payment, Product};
use crate::domain::ports::{Catalog, MarkPaid, OrderStore};
use crate::error::{CommerceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    order_items: HashMap<Uuid, Vec<OrderItem>>,
    /// Keyed by order id; at most one payment per order.
    payments: HashMap<Uuid, Payment>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for InMemoryStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn list_in_stock(&self) -> Result<Vec<Product>> {
        let inner = self.inner.read().await;
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| p.is_in_stock())
            .cloned()
            .collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.products.insert(product.id, product);
        Ok(())
    }

    async fn decrement_stock(&self, product_id: Uuid, qty: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let product = inner
            .products
            .get_mut(&product_id)
            .ok_or(CommerceError::InsufficientStock(product_id))?;
        if product.stock < qty {
            return Err(CommerceError::InsufficientStock(product_id));
        }
        product.stock -= qty;
        Ok(())
    }

    async fn increment_stock(&self, product_id: Uuid, qty: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(product) = inner.products.get_mut(&product_id) {
            product.stock = product.stock.saturating_add(qty);
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.orders.insert(order.id, order.clone());
        inner.order_items.insert(order.id, items.to_vec());
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        let inner = self.inner.read().await;
        Ok(inner.orders.get(&id).cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let inner = self.inner.read().await;
        Ok(inner.order_items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn record_intent(&self, order_id: Uuid, gateway_order_id: &str) -> Result<Payment> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))?;
        // At most one payment per order: a second intent returns the one
        // already on record instead of overwriting it.
        if let Some(existing) = inner.payments.get(&order_id) {
            return Ok(existing.clone());
        }
        order.payment_reference = Some(gateway_order_id.to_string());
        let payment = Payment::new(order_id, gateway_order_id);
        inner.payments.insert(order_id, payment.clone());
        Ok(payment)
    }

    async fn payment_for_order(&self, order_id: Uuid) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner.payments.get(&order_id).cloned())
    }

    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkPaid> {
        let mut inner = self.inner.write().await;
        let order_id = inner
            .orders
            .values()
            .find(|o| o.payment_reference.as_deref() == Some(gateway_order_id))
            .map(|o| o.id)
            .ok_or_else(|| CommerceError::OrderNotFound(gateway_order_id.to_string()))?;

        // One write guard covers the check and both mutations, so a
        // concurrent duplicate callback observes the paid order and
        // degrades to AlreadyPaid.
        let order = inner.orders.get_mut(&order_id).ok_or_else(|| {
            CommerceError::OrderNotFound(gateway_order_id.to_string())
        })?;
        if order.is_paid {
            return Ok(MarkPaid::AlreadyPaid {
                order: order.clone(),
            });
        }
        order.mark_paid(at);
        let order = order.clone();

        let payment = inner
            .payments
            .entry(order_id)
            .or_insert_with(|| Payment::new(order_id, gateway_order_id));
        payment.confirm(gateway_payment_id, gateway_signature, at);

        Ok(MarkPaid::Applied {
            order,
            payment: payment.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Money;
    use rust_decimal_macros::dec;

    fn seeded_product(stock: u32) -> Product {
        Product::new("Ghee 1L", Money::new(dec!(650.00), "INR"), stock)
    }

    #[tokio::test]
    async fn decrement_is_conditional() {
        let store = InMemoryStore::new();
        let product = seeded_product(2);
        store.insert_product(product.clone()).await.unwrap();

        store.decrement_stock(product.id, 2).await.unwrap();
        let err = store.decrement_stock(product.id, 1).await.unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock(id) if id == product.id));

        let left = store.products_by_ids(&[product.id]).await.unwrap();
        assert_eq!(left[0].stock, 0);
    }

    #[tokio::test]
    async fn concurrent_decrements_for_last_unit_pick_one_winner() {
        let store = InMemoryStore::new();
        let product = seeded_product(1);
        store.insert_product(product.clone()).await.unwrap();

        let (a, b) = tokio::join!(
            store.decrement_stock(product.id, 1),
            store.decrement_stock(product.id, 1),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }

    #[tokio::test]
    async fn increment_saturates_at_stock_ceiling() {
        let store = InMemoryStore::new();
        let product = seeded_product(u32::MAX);
        store.insert_product(product.clone()).await.unwrap();

        store.increment_stock(product.id, 1).await.unwrap();
        let left = store.products_by_ids(&[product.id]).await.unwrap();
        assert_eq!(left[0].stock, u32::MAX);
    }

    #[tokio::test]
    async fn record_intent_keeps_the_first_payment() {
        let store = InMemoryStore::new();
        let order = Order::new(Uuid::now_v7(), "a@b.in", Money::new(dec!(100.00), "INR"));
        store.insert_order(&order, &[]).await.unwrap();

        let first = store.record_intent(order.id, "order_rzp_a").await.unwrap();
        let second = store.record_intent(order.id, "order_rzp_b").await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.gateway_order_id, "order_rzp_a");
        let order = store.order(order.id).await.unwrap().unwrap();
        assert_eq!(order.payment_reference.as_deref(), Some("order_rzp_a"));
    }

    #[tokio::test]
    async fn mark_paid_applies_once_then_reports_already_paid() {
        let store = InMemoryStore::new();
        let order = Order::new(Uuid::now_v7(), "a@b.in", Money::new(dec!(100.00), "INR"));
        store.insert_order(&order, &[]).await.unwrap();
        store.record_intent(order.id, "order_rzp_1").await.unwrap();

        let at = Utc::now();
        let first = store.mark_paid("order_rzp_1", "pay_1", "sig", at).await.unwrap();
        let MarkPaid::Applied { order: paid, payment } = first else {
            panic!("first mark_paid must apply");
        };
        assert!(paid.paid_state_consistent());
        assert_eq!(paid.paid_at, payment.paid_at);

        let second = store.mark_paid("order_rzp_1", "pay_1", "sig", Utc::now()).await.unwrap();
        assert!(matches!(second, MarkPaid::AlreadyPaid { .. }));

        // paid_at keeps the first commit instant
        let payment = store.payment_for_order(order.id).await.unwrap().unwrap();
        assert_eq!(payment.paid_at, Some(at));
    }

    #[tokio::test]
    async fn mark_paid_creates_missing_payment_row() {
        let store = InMemoryStore::new();
        let mut order = Order::new(Uuid::now_v7(), "a@b.in", Money::new(dec!(100.00), "INR"));
        order.payment_reference = Some("order_rzp_2".to_string());
        store.insert_order(&order, &[]).await.unwrap();
        assert!(store.payment_for_order(order.id).await.unwrap().is_none());

        let outcome = store
            .mark_paid("order_rzp_2", "pay_2", "sig", Utc::now())
            .await
            .unwrap();
        assert!(matches!(outcome, MarkPaid::Applied { .. }));

        let payment = store.payment_for_order(order.id).await.unwrap().unwrap();
        assert_eq!(payment.gateway_payment_id.as_deref(), Some("pay_2"));
    }

    #[tokio::test]
    async fn mark_paid_unknown_reference_is_order_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .mark_paid("order_rzp_ghost", "pay", "sig", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::OrderNotFound(_)));
    }
}
