//! Domain model: aggregates, value objects, and the ports they cross.
pub mod aggregates;
pub mod ports;
pub mod value_objects;
