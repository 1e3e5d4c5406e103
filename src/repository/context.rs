//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;
use tracing::debug;

use super::pool::{DbError, DbPool};
use super::thread::DieselThreadRepository;

/// Database context that holds the pool and hands out repositories.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::from_sqlite_path(&settings.database_path);
/// ctx.init_schema().await?;
/// let threads = ctx.threads().list_all().await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn from_sqlite_path(db_path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(db_path),
        }
    }

    /// Get a thread repository.
    pub fn threads(&self) -> DieselThreadRepository {
        DieselThreadRepository::new(self.pool.clone())
    }

    /// Initialize database schema. Safe to run on every startup.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing schema in {}", self.pool.database_url());
        crate::with_conn!(self.pool, conn => {
            conn.batch_execute(include_str!("schema_sqlite.sql")).await
        })
    }
}
