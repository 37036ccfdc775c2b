//! Clock and walk-in tab helpers

/// Prefix used for synthetically generated walk-in tab identifiers.
pub const WALK_IN_PREFIX: &str = "Walk-in-";

/// 当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a walk-in tab identifier, e.g. `Walk-in-1735689600000`.
///
/// Walk-in customers have no physical table; the generated id takes
/// the place of a table number for the lifetime of the tab.
pub fn walk_in_table_id() -> String {
    format!("{}{}", WALK_IN_PREFIX, now_millis())
}

/// Whether a table number denotes a walk-in tab rather than a
/// physical table.
pub fn is_walk_in(table_number: &str) -> bool {
    table_number.starts_with(WALK_IN_PREFIX)
}
