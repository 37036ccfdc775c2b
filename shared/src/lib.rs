//! Shared domain types for the Saffron POS core
//!
//! This crate holds the pure data model (orders, line items, the
//! catalog copies kept alongside them) and small utilities used by
//! both the engine and its drivers. It knows nothing about storage.

pub mod models;
pub mod util;

pub use models::{Category, Order, OrderItem, OrderStatus, Product};
