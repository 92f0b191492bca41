//! Persistence for listing records.
//!
//! Records are keyed by the site's external identifier; [`ListingStore::save`]
//! replaces whatever is stored under that key.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Listing;

/// SQLite primary result codes for a busy or locked database
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Listing>>;

    /// Insert or overwrite the record with the same external id
    async fn save(&self, listing: &Listing) -> Result<()>;
}

/// Whether a store error may clear up on its own: pool exhaustion, I/O, or a
/// busy/locked database. Constraint violations, bad SQL and corrupt rows are
/// permanent.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .any(|cause| match cause {
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => true,
            sqlx::Error::Database(db) => db
                .code()
                .and_then(|code| code.parse::<i64>().ok())
                .map_or(false, |code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn pool_and_io_errors_are_transient() {
        let timed_out = Err::<(), _>(sqlx::Error::PoolTimedOut)
            .context("Failed to save listing 7")
            .unwrap_err();
        assert!(is_transient(&timed_out));

        let io = anyhow::Error::new(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        )));
        assert!(is_transient(&io));
    }

    #[test]
    fn other_errors_are_permanent() {
        assert!(!is_transient(&anyhow::Error::new(sqlx::Error::RowNotFound)));
        assert!(!is_transient(&anyhow::anyhow!("disk full")));
    }

    #[tokio::test]
    async fn sql_errors_are_permanent() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let err = sqlx::query("SELECT * FROM no_such_table")
            .execute(&pool)
            .await
            .context("Failed to query")
            .unwrap_err();

        assert!(!is_transient(&err));
    }
}
