//! Aggregates module
pub mod cart;
pub mod order;
pub mod payment;
pub mod product;

pub use cart::{Cart, CartLine, CartView};
pub use order::{Order, OrderItem, OrderStatus};
pub use payment::{Payment, PaymentStatus};
pub use product::Product;
