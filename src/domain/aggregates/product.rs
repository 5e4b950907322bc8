//! Product: the catalog's view of a purchasable item.

use crate::domain::value_objects::Money;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            price,
            stock,
        }
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    pub fn has_stock(&self, qty: u32) -> bool {
        self.stock >= qty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stock_checks() {
        let p = Product::new("Basmati Rice 5kg", Money::new(dec!(499.00), "INR"), 3);
        assert!(p.is_in_stock());
        assert!(p.has_stock(3));
        assert!(!p.has_stock(4));
    }
}
