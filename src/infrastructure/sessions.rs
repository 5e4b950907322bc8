//! Session-keyed cart storage.
//!
//! An explicit key-value store scoped by session identifier, injected into
//! the services that need it. Carts live only in memory; they never outlive
//! the process, let alone the session.

use crate::domain::aggregates::Cart;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionCarts {
    carts: Arc<RwLock<HashMap<String, Cart>>>,
}

impl SessionCarts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_item(&self, session_id: &str, product_id: Uuid, qty: u32) {
        let mut carts = self.carts.write().await;
        carts.entry(session_id.to_string()).or_default().add(product_id, qty);
    }

    pub async fn remove_item(&self, session_id: &str, product_id: Uuid) {
        let mut carts = self.carts.write().await;
        if let Some(cart) = carts.get_mut(session_id) {
            cart.remove(product_id);
        }
    }

    pub async fn clear(&self, session_id: &str) {
        let mut carts = self.carts.write().await;
        carts.remove(session_id);
    }

    /// Snapshot of the session's cart; an unknown session yields an empty one.
    pub async fn cart(&self, session_id: &str) -> Cart {
        let carts = self.carts.read().await;
        carts.get(session_id).cloned().unwrap_or_default()
    }
}
