//! Order and line-item models

use serde::{Deserialize, Serialize};

use crate::util;

/// Order status state machine
///
/// `Open → Served → Paid` is the happy path; `Cancelled` is the
/// terminal escape hatch from either non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Open,
    Served,
    Paid,
    Cancelled,
}

impl OrderStatus {
    /// An active order still claims its table.
    pub fn is_active(&self) -> bool {
        !matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Terminal states accept no further mutation except the
    /// post-payment tender correction.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// A running bill associated with a table or walk-in tab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Globally unique id, immutable after creation
    pub id: String,
    /// Current table label ("A1", "7B", or a generated walk-in tab id)
    pub table_number: String,
    /// Display name for walk-ins or named reservations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Table labels visited by this bill, oldest first.
    ///
    /// Invariants: never empty, last element equals `table_number`,
    /// no two consecutive entries are equal.
    pub table_history: Vec<String>,
    pub status: OrderStatus,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis, advances on every mutation
    pub updated_at: i64,
    /// Unix millis, present once status becomes `Paid`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    /// Derived: sum of `total` over this order's items.
    ///
    /// After payment the tender split becomes authoritative instead
    /// (see `OrderManager::adjust_payment`).
    pub total_amount: f64,
    /// Cash tender, zero until payment
    pub payment_cash: f64,
    /// Online tender, zero until payment
    pub payment_online: f64,
    /// Consumed by the backup collaborator
    pub exported_to_excel: bool,
}

impl Order {
    /// Build a fresh open order for a table or walk-in tab.
    pub fn new(table_number: impl Into<String>, customer_name: Option<String>) -> Self {
        let table_number = table_number.into();
        let now = util::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            table_history: vec![table_number.clone()],
            table_number,
            customer_name,
            status: OrderStatus::Open,
            created_at: now,
            updated_at: now,
            paid_at: None,
            total_amount: 0.0,
            payment_cash: 0.0,
            payment_online: 0.0,
            exported_to_excel: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Move this bill to `table`, appending to the breadcrumb unless
    /// the label equals the current last entry.
    ///
    /// Returns `true` if anything changed.
    pub fn push_table(&mut self, table: &str) -> bool {
        if self.table_history.last().map(String::as_str) == Some(table) {
            self.table_number = table.to_string();
            return false;
        }
        self.table_history.push(table.to_string());
        self.table_number = table.to_string();
        true
    }
}

/// One priced entry on an order's bill
///
/// `item_name`/`category_name`/`rate` are denormalized from the
/// catalog at add-time; later catalog edits never touch placed lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// Store-assigned id, unique across the item collection.
    /// Zero until the store allocates one on insert.
    #[serde(default)]
    pub id: u64,
    /// Owning order id
    pub order_id: String,
    pub item_name: String,
    pub category_name: String,
    /// Positive
    pub quantity: i32,
    /// Unit price at time of addition
    pub rate: f64,
    /// Invariant: `total == quantity * rate` (2-dp rounded)
    pub total: f64,
    /// Set when the line was carried over by a merge: the table it
    /// was originally ordered on. Never cleared once set, so the
    /// provenance survives chained merges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_table: Option<String>,
}

impl OrderItem {
    /// Whether this line was carried in from another table by a merge.
    pub fn is_merged_in(&self) -> bool {
        self.original_table.is_some()
    }
}
