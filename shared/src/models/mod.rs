//! Persisted entity models
//!
//! One file per entity, mirroring the collections owned by the
//! entity store: orders, order items, and the denormalized catalog
//! (categories, products) that backup/restore carries along.

pub mod category;
pub mod order;
pub mod product;

pub use category::Category;
pub use order::{Order, OrderItem, OrderStatus};
pub use product::Product;
