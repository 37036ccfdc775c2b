//! Saffron POS core — order/table transactional engine
//!
//! This crate implements the order-tracking core of a restaurant
//! point-of-sale: which tables hold open bills, the line items placed
//! against each bill, the table move/merge algorithm, and the status
//! state machine gating payment.
//!
//! # Architecture
//!
//! ```text
//! Caller (UI / driver)
//!     │
//!     ▼
//! OrderManager ── lifecycle / ledger / transfer / payment
//!     │
//!     ▼
//! EntityStore (redb) ── orders + order_items + catalog, one
//!     │                 write transaction per mutating operation
//!     ▼
//! StoreChange broadcast ── per-collection notification after commit
//! ```
//!
//! Every mutating operation is a single redb write transaction: an
//! order and its items are never observed half-updated, and a failure
//! anywhere inside the transaction body rolls the whole mutation back.

pub mod backup;
pub mod config;
pub mod events;
pub mod money;
pub mod orders;
pub mod store;

pub use backup::BackupDocument;
pub use config::{CoreConfig, CreationPolicy};
pub use events::{Collection, StoreChange};
pub use orders::{MoveOutcome, OrderError, OrderManager, OrderResult};
pub use store::{EntityStore, StorageError, StorageResult};
