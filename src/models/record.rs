use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format used when rendering record timestamps into backup artifacts.
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row of the `records` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    any(feature = "database-sqlite", feature = "database-postgres"),
    derive(sqlx::FromRow)
)]
pub struct Record {
    /// Store-assigned identity
    pub id: i64,
    /// Display name, never empty
    pub name: String,
    /// Ordering key; the oldest rows are archived first
    pub date: NaiveDateTime,
}

/// Renders the record as a tuple, e.g. `(7, 'Ada Lovelace', 2024-03-01 09:30:00)`.
///
/// Single quotes inside the name are doubled so every line stays unambiguous.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, '{}', {})",
            self.id,
            self.name.replace('\'', "''"),
            self.date.format(RECORD_DATE_FORMAT)
        )
    }
}

/// Input for inserting a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub date: NaiveDateTime,
}
