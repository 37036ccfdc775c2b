//! Product model

use serde::{Deserialize, Serialize};

/// Menu product (read-only copy held by the entity store)
///
/// The ledger reads `name`, `category_name` and `price` once at
/// add-time and stores a denormalized copy on the line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category_name: String,
    /// Unit price in currency unit
    pub price: f64,
    pub is_active: bool,
    /// Unix millis
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn new(name: impl Into<String>, category_name: impl Into<String>, price: f64) -> Self {
        let now = crate::util::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            category_name: category_name.into(),
            price,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
