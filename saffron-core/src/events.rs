//! Change notifications
//!
//! The core publishes one [`StoreChange`] per collection touched by a
//! committed transaction, over a `tokio::sync::broadcast` channel.
//! Subscribers (live views, the backup collaborator) re-query on
//! receipt; they are guaranteed to observe committed state only,
//! never a torn mid-transaction view.

use serde::{Deserialize, Serialize};

/// The four collections owned by the entity store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Collection {
    Categories,
    Products,
    Orders,
    OrderItems,
}

/// A committed write touched `collection`.
///
/// `order_id` narrows the invalidation for order-scoped subscribers
/// ("items for order X"); collection-wide changes (restore) leave it
/// unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreChange {
    pub collection: Collection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl StoreChange {
    pub fn collection(collection: Collection) -> Self {
        Self {
            collection,
            order_id: None,
        }
    }

    pub fn order(collection: Collection, order_id: impl Into<String>) -> Self {
        Self {
            collection,
            order_id: Some(order_id.into()),
        }
    }
}
