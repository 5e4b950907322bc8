//! Kirana Commerce
//!
//! A storefront checkout-and-payments service: catalog lookup,
//! session-scoped shopping carts, checkout that snapshots a cart into a
//! durable order, Razorpay payment intents with HMAC-verified callbacks,
//! atomic order/payment reconciliation, and fire-and-forget confirmation
//! email.
//!
//! The flow: cart -> checkout (stock reserved, order created) -> gateway
//! intent opened -> customer pays externally -> gateway calls back ->
//! signature verified -> order and payment marked paid in one unit ->
//! confirmation mail sent.

pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod http;
pub mod infrastructure;
pub mod notify;
pub mod payments;

pub use error::{CommerceError, Result};
