//! Checkout: turns a session cart into a durable order.
//!
//! Stock is decremented at order-creation time ("reserve on order, confirm
//! on pay"). The catalog exposes per-product conditional decrements rather
//! than a multi-product transaction, so all-or-nothing is achieved by
//! compensation: any failure after the first decrement restocks everything
//! already taken before the error surfaces.

use crate::domain::aggregates::{Order, OrderItem};
use crate::domain::ports::{Catalog, OrderStore};
use crate::error::{CommerceError, Result};
use crate::infrastructure::SessionCarts;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<dyn Catalog>,
    orders: Arc<dyn OrderStore>,
    carts: SessionCarts,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        orders: Arc<dyn OrderStore>,
        carts: SessionCarts,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            orders,
            carts,
            currency: currency.into(),
        }
    }

    pub async fn create_order(
        &self,
        user_id: Uuid,
        user_email: &str,
        session_id: &str,
    ) -> Result<CheckoutReceipt> {
        let cart = self.carts.cart(session_id).await;
        if cart.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let products = self.catalog.products_by_ids(&cart.product_ids()).await?;
        let view = cart.resolve(&products, &self.currency);
        // Every product may have vanished from the catalog since add-time.
        if view.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let mut decremented: Vec<(Uuid, u32)> = Vec::with_capacity(view.lines.len());
        for line in &view.lines {
            if let Err(e) = self
                .catalog
                .decrement_stock(line.product.id, line.quantity)
                .await
            {
                self.restock(&decremented).await;
                return Err(e);
            }
            decremented.push((line.product.id, line.quantity));
        }

        let order = Order::new(user_id, user_email, view.total());
        let items: Vec<OrderItem> = view
            .lines
            .iter()
            .map(|line| {
                OrderItem::new(order.id, line.product.id, line.unit_price.clone(), line.quantity)
            })
            .collect();

        if let Err(e) = self.orders.insert_order(&order, &items).await {
            self.restock(&decremented).await;
            return Err(e);
        }

        self.carts.clear(session_id).await;
        tracing::info!(
            order_id = %order.id,
            total = %order.total_price,
            lines = items.len(),
            "order created"
        );
        Ok(CheckoutReceipt { order, items })
    }

    async fn restock(&self, lines: &[(Uuid, u32)]) {
        for (product_id, qty) in lines {
            if let Err(e) = self.catalog.increment_stock(*product_id, *qty).await {
                tracing::error!(%product_id, qty, error = %e, "restock after failed checkout failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{OrderStatus, Product};
    use crate::domain::value_objects::Money;
    use crate::infrastructure::InMemoryStore;
    use rust_decimal_macros::dec;

    fn service(store: &InMemoryStore) -> (CheckoutService, SessionCarts) {
        let carts = SessionCarts::new();
        let service = CheckoutService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            carts.clone(),
            "INR",
        );
        (service, carts)
    }

    async fn seed(store: &InMemoryStore, price: rust_decimal::Decimal, stock: u32) -> Product {
        let product = Product::new("Test", Money::new(price, "INR"), stock);
        store.insert_product(product.clone()).await.unwrap();
        product
    }

    #[tokio::test]
    async fn checkout_snapshot_scenario() {
        let store = InMemoryStore::new();
        let (service, carts) = service(&store);
        let a = seed(&store, dec!(100.00), 5).await;
        let b = seed(&store, dec!(50.00), 5).await;

        carts.add_item("s1", a.id, 2).await;
        carts.add_item("s1", b.id, 1).await;

        let receipt = service
            .create_order(Uuid::now_v7(), "a@b.in", "s1")
            .await
            .unwrap();

        assert_eq!(receipt.order.total_price.amount(), dec!(250.00));
        assert_eq!(receipt.order.status, OrderStatus::Pending);
        assert!(!receipt.order.is_paid);
        assert_eq!(receipt.items.len(), 2);

        let remaining = store.products_by_ids(&[a.id, b.id]).await.unwrap();
        let stock_of = |id| remaining.iter().find(|p| p.id == id).unwrap().stock;
        assert_eq!(stock_of(a.id), 3);
        assert_eq!(stock_of(b.id), 4);

        assert!(carts.cart("s1").await.is_empty());
    }

    #[tokio::test]
    async fn order_total_survives_later_price_changes() {
        let store = InMemoryStore::new();
        let (service, carts) = service(&store);
        let product = seed(&store, dec!(100.00), 5).await;
        carts.add_item("s1", product.id, 1).await;

        let receipt = service
            .create_order(Uuid::now_v7(), "a@b.in", "s1")
            .await
            .unwrap();

        // reprice the catalog after the fact
        let mut repriced = product.clone();
        repriced.price = Money::new(dec!(999.00), "INR");
        repriced.stock = 4;
        store.insert_product(repriced).await.unwrap();

        let order = store.order(receipt.order.id).await.unwrap().unwrap();
        assert_eq!(order.total_price.amount(), dec!(100.00));
        let items = store.order_items(order.id).await.unwrap();
        assert_eq!(items[0].unit_price.amount(), dec!(100.00));
    }

    #[tokio::test]
    async fn empty_cart_fails_without_mutation() {
        let store = InMemoryStore::new();
        let (service, _) = service(&store);
        let err = service
            .create_order(Uuid::now_v7(), "a@b.in", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::EmptyCart));
    }

    #[tokio::test]
    async fn cart_of_vanished_products_is_empty_cart() {
        let store = InMemoryStore::new();
        let (service, carts) = service(&store);
        carts.add_item("s1", Uuid::now_v7(), 3).await;

        let err = service
            .create_order(Uuid::now_v7(), "a@b.in", "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::EmptyCart));
    }

    #[tokio::test]
    async fn insufficient_stock_leaves_state_untouched() {
        let store = InMemoryStore::new();
        let (service, carts) = service(&store);
        let product = seed(&store, dec!(100.00), 1).await;
        carts.add_item("s1", product.id, 2).await;

        let err = service
            .create_order(Uuid::now_v7(), "a@b.in", "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock(id) if id == product.id));

        let unchanged = store.products_by_ids(&[product.id]).await.unwrap();
        assert_eq!(unchanged[0].stock, 1);
        // failed checkout keeps the cart
        assert_eq!(carts.cart("s1").await.quantity(product.id), 2);
    }

    #[tokio::test]
    async fn partial_failure_restocks_earlier_lines() {
        let store = InMemoryStore::new();
        let (service, carts) = service(&store);
        let ok = seed(&store, dec!(10.00), 5).await;
        let short = seed(&store, dec!(10.00), 1).await;

        carts.add_item("s1", ok.id, 2).await;
        carts.add_item("s1", short.id, 3).await;

        let err = service
            .create_order(Uuid::now_v7(), "a@b.in", "s1")
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock(id) if id == short.id));

        let after = store.products_by_ids(&[ok.id, short.id]).await.unwrap();
        let stock_of = |id| after.iter().find(|p| p.id == id).unwrap().stock;
        assert_eq!(stock_of(ok.id), 5);
        assert_eq!(stock_of(short.id), 1);
    }

    #[tokio::test]
    async fn concurrent_checkouts_for_last_unit_pick_one_winner() {
        let store = InMemoryStore::new();
        let (service, carts) = service(&store);
        let product = seed(&store, dec!(100.00), 1).await;
        carts.add_item("s1", product.id, 1).await;
        carts.add_item("s2", product.id, 1).await;

        let (a, b) = tokio::join!(
            service.create_order(Uuid::now_v7(), "a@b.in", "s1"),
            service.create_order(Uuid::now_v7(), "b@b.in", "s2"),
        );

        let successes = a.is_ok() as u8 + b.is_ok() as u8;
        assert_eq!(successes, 1);
        let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(loser, CommerceError::InsufficientStock(_)));

        let after = store.products_by_ids(&[product.id]).await.unwrap();
        assert_eq!(after[0].stock, 0);
    }
}
