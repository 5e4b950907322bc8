//! Session-scoped shopping cart.
//!
//! A cart is a plain mapping of product id to quantity. Prices and stock are
//! never stored here; they are resolved against the catalog when the cart is
//! viewed or checked out, so a cart can hold products that have since been
//! deleted (those lines drop out at resolution time).

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::Money;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Cart {
    entries: HashMap<Uuid, u32>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `qty` of a product, merging with any existing entry. Stock is
    /// not checked here; checkout is the only place that enforces it. The
    /// merged quantity saturates at `u32::MAX` rather than wrapping.
    pub fn add(&mut self, product_id: Uuid, qty: u32) {
        let entry = self.entries.entry(product_id).or_insert(0);
        *entry = entry.saturating_add(qty);
    }

    /// Removes a product entirely. Absent ids are a no-op, not an error.
    pub fn remove(&mut self, product_id: Uuid) {
        self.entries.remove(&product_id);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quantity(&self, product_id: Uuid) -> u32 {
        self.entries.get(&product_id).copied().unwrap_or(0)
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.entries.keys().copied().collect()
    }

    /// Materializes the cart against catalog products. Entries whose product
    /// is missing from `products` are silently dropped.
    pub fn resolve(&self, products: &[Product], currency: &str) -> CartView {
        let lines = products
            .iter()
            .filter_map(|product| {
                let quantity = self.quantity(product.id);
                (quantity > 0).then(|| CartLine {
                    product: product.clone(),
                    quantity,
                    unit_price: product.price.clone(),
                    line_total: product.price.multiply(quantity),
                })
            })
            .collect();
        CartView {
            lines,
            currency: currency.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub currency: String,
}

impl CartView {
    pub fn total(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(&self.currency), |acc, line| {
                acc.add(&line.line_total).unwrap_or(acc)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
