//! Category model

use serde::{Deserialize, Serialize};

/// Menu category (read-only copy held by the entity store; managed
/// by the out-of-scope catalog collaborator)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    /// Unix millis
    pub created_at: i64,
    pub updated_at: i64,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        let now = crate::util::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
