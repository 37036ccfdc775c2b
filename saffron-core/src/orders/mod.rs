//! Order management for the Saffron POS core
//!
//! - **manager**: `OrderManager` construction, lifecycle operations
//!   (open table, status, delete/cancel) and read accessors
//! - **ledger**: line-item mutations with total recomputation
//! - **transfer**: the table move/merge algorithm
//! - **payment**: payment gate and tender handling
//! - **error**: domain error taxonomy
//!
//! # Data Flow
//!
//! ```text
//! operation → begin write transaction
//!           → mutate Order + OrderItem + table index
//!           → commit
//!           → broadcast StoreChange per touched collection
//! ```
//!
//! Every mutating operation commits or rolls back as one unit; change
//! notifications go out only after a successful commit.

pub mod error;
pub mod ledger;
pub mod manager;
pub mod payment;
pub mod transfer;

pub use error::{OrderError, OrderResult};
pub use manager::OrderManager;
pub use transfer::MoveOutcome;
