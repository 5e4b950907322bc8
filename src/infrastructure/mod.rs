//! Store adapters behind the domain ports.
pub mod in_memory;
pub mod postgres;
pub mod sessions;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use sessions::SessionCarts;
