//! Postgres store implementing the catalog and order-store ports with sqlx.
//!
//! Both races the design must close are closed here with conditional
//! UPDATEs: `stock = stock - $2 ... WHERE stock >= $2` for checkout, and
//! `... WHERE payment_reference = $1 AND is_paid = FALSE` for mark-paid.

use crate::domain::aggregates::order::OrderStatus;
use crate::domain::aggregates::payment::PaymentStatus;
use crate::domain::aggregates::{Order, OrderItem, Payment, Product};
use crate::domain::ports::{Catalog, MarkPaid, OrderStore};
use crate::domain::value_objects::Money;
use crate::error::{CommerceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    currency: String,
    stock: i32,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id,
            name: r.name,
            price: Money::new(r.price, &r.currency),
            stock: r.stock.max(0) as u32,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    user_email: String,
    total_price: Decimal,
    currency: String,
    status: String,
    is_paid: bool,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = CommerceError;

    fn try_from(r: OrderRow) -> Result<Self> {
        let status = OrderStatus::parse(&r.status)
            .ok_or_else(|| CommerceError::Storage(format!("unknown order status {:?}", r.status)))?;
        Ok(Order {
            id: r.id,
            user_id: r.user_id,
            user_email: r.user_email,
            total_price: Money::new(r.total_price, &r.currency),
            status,
            is_paid: r.is_paid,
            payment_reference: r.payment_reference,
            created_at: r.created_at,
            paid_at: r.paid_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    unit_price: Decimal,
    currency: String,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        OrderItem {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            unit_price: Money::new(r.unit_price, &r.currency),
            quantity: r.quantity.max(0) as u32,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    gateway_order_id: String,
    gateway_payment_id: Option<String>,
    gateway_signature: Option<String>,
    status: String,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = CommerceError;

    fn try_from(r: PaymentRow) -> Result<Self> {
        let status = PaymentStatus::parse(&r.status).ok_or_else(|| {
            CommerceError::Storage(format!("unknown payment status {:?}", r.status))
        })?;
        Ok(Payment {
            id: r.id,
            order_id: r.order_id,
            gateway_order_id: r.gateway_order_id,
            gateway_payment_id: r.gateway_payment_id,
            gateway_signature: r.gateway_signature,
            status,
            paid_at: r.paid_at,
            created_at: r.created_at,
        })
    }
}

#[async_trait]
impl Catalog for PostgresStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, currency, stock FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_in_stock(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, currency, stock FROM products WHERE stock > 0 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, price, currency, stock) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(product.price.currency())
        .bind(product.stock as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn decrement_stock(&self, product_id: Uuid, qty: u32) -> Result<()> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(product_id)
        .bind(qty as i32)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CommerceError::InsufficientStock(product_id));
        }
        Ok(())
    }

    async fn increment_stock(&self, product_id: Uuid, qty: u32) -> Result<()> {
        sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(product_id)
            .bind(qty as i32)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO orders (id, user_id, user_email, total_price, currency, status, is_paid, payment_reference, created_at, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(&order.user_email)
        .bind(order.total_price.amount())
        .bind(order.total_price.currency())
        .bind(order.status.as_str())
        .bind(order.is_paid)
        .bind(&order.payment_reference)
        .bind(order.created_at)
        .bind(order.paid_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, unit_price, currency, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.product_id)
            .bind(item.unit_price.amount())
            .bind(item.unit_price.currency())
            .bind(item.quantity as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, user_email, total_price, currency, status, is_paid, payment_reference, created_at, paid_at \
             FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, unit_price, currency, quantity \
             FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn record_intent(&self, order_id: Uuid, gateway_order_id: &str) -> Result<Payment> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE orders SET payment_reference = $2 WHERE id = $1")
            .bind(order_id)
            .bind(gateway_order_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CommerceError::OrderNotFound(order_id.to_string()));
        }

        let payment = Payment::new(order_id, gateway_order_id);
        let inserted = sqlx::query(
            "INSERT INTO payments (id, order_id, gateway_order_id, gateway_payment_id, gateway_signature, status, paid_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(payment.id)
        .bind(payment.order_id)
        .bind(&payment.gateway_order_id)
        .bind(&payment.gateway_payment_id)
        .bind(&payment.gateway_signature)
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        // A payment already on record wins: roll back the reference
        // overwrite and return the existing row.
        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return self
                .payment_for_order(order_id)
                .await?
                .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()));
        }

        tx.commit().await?;
        Ok(payment)
    }

    async fn payment_for_order(&self, order_id: Uuid) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, order_id, gateway_order_id, gateway_payment_id, gateway_signature, status, paid_at, created_at \
             FROM payments WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Payment::try_from).transpose()
    }

    async fn mark_paid(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: &str,
        at: DateTime<Utc>,
    ) -> Result<MarkPaid> {
        let mut tx = self.pool.begin().await?;

        // Conditional gate: only one of N concurrent callbacks for the same
        // gateway order id gets a row back here.
        let updated = sqlx::query_as::<_, OrderRow>(
            "UPDATE orders SET is_paid = TRUE, status = 'paid', paid_at = $2 \
             WHERE payment_reference = $1 AND is_paid = FALSE \
             RETURNING id, user_id, user_email, total_price, currency, status, is_paid, payment_reference, created_at, paid_at",
        )
        .bind(gateway_order_id)
        .bind(at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order_row) = updated else {
            tx.commit().await?;
            let existing = sqlx::query_as::<_, OrderRow>(
                "SELECT id, user_id, user_email, total_price, currency, status, is_paid, payment_reference, created_at, paid_at \
                 FROM orders WHERE payment_reference = $1",
            )
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CommerceError::OrderNotFound(gateway_order_id.to_string()))?;
            return Ok(MarkPaid::AlreadyPaid {
                order: Order::try_from(existing)?,
            });
        };
        let order = Order::try_from(order_row)?;

        let payment_id = Uuid::now_v7();
        let payment_row = sqlx::query_as::<_, PaymentRow>(
            "INSERT INTO payments (id, order_id, gateway_order_id, gateway_payment_id, gateway_signature, status, paid_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, 'paid', $6, $7) \
             ON CONFLICT (order_id) DO UPDATE SET \
               gateway_payment_id = EXCLUDED.gateway_payment_id, \
               gateway_signature = EXCLUDED.gateway_signature, \
               status = 'paid', paid_at = EXCLUDED.paid_at \
             RETURNING id, order_id, gateway_order_id, gateway_payment_id, gateway_signature, status, paid_at, created_at",
        )
        .bind(payment_id)
        .bind(order.id)
        .bind(gateway_order_id)
        .bind(gateway_payment_id)
        .bind(gateway_signature)
        .bind(at)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(MarkPaid::Applied {
            order,
            payment: Payment::try_from(payment_row)?,
        })
    }
}
