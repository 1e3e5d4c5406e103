//! Repository layer for database persistence.
//!
//! All database access uses Diesel over SQLite, driven through
//! diesel-async's `SyncConnectionWrapper`.

pub mod context;
pub mod models;
pub mod pool;
pub mod thread;
pub mod util;

pub use context::DbContext;
pub use pool::{DbError, DbPool, DieselError};
pub use thread::{DieselThreadRepository, ThreadStore};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
