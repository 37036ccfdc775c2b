//! Engine configuration
//!
//! All knobs can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | CREATION_POLICY | return_existing | `return_existing` or `reject` |
//! | WALK_IN_LABEL | Walk-in | Default customer name for walk-in tabs |

use serde::{Deserialize, Serialize};

/// Policy applied when a table already holds an active order at
/// open time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CreationPolicy {
    /// Idempotent open: return the existing order unchanged.
    #[default]
    ReturnExisting,
    /// Fail with `OrderError::TableOccupied`.
    Reject,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    pub creation_policy: CreationPolicy,
    /// Customer name filled in for walk-in tabs opened without one
    pub walk_in_label: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            creation_policy: CreationPolicy::default(),
            walk_in_label: "Walk-in".to_string(),
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back
    /// to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let creation_policy = match std::env::var("CREATION_POLICY").as_deref() {
            Ok("reject") => CreationPolicy::Reject,
            Ok("return_existing") => CreationPolicy::ReturnExisting,
            _ => CreationPolicy::default(),
        };
        Self {
            creation_policy,
            walk_in_label: std::env::var("WALK_IN_LABEL").unwrap_or_else(|_| "Walk-in".into()),
        }
    }
}
