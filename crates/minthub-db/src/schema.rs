//! Schema bootstrap for the transaction queue.

use sqlx::SqlitePool;

use minthub_core::{Error, Result};

/// The transaction job table.
///
/// Timestamps are fixed-precision RFC 3339 text, so lexicographic order
/// on `created_at` is chronological order; `next_run_at` is epoch
/// milliseconds to make the eligibility comparison an integer scan.
const CREATE_TXN_QUEUE: &str = "
    CREATE TABLE IF NOT EXISTS txn_queue (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        payload TEXT NOT NULL,
        status TEXT NOT NULL,
        attempts INTEGER NOT NULL,
        error TEXT,
        result TEXT,
        next_run_at INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )";

/// Index backing the `take_next` eligibility scan.
const CREATE_TXN_QUEUE_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_txn_queue_status_next_run
        ON txn_queue (status, next_run_at)";

/// Create required tables and indexes if they do not exist.
///
/// Must run once at startup before any store is used; the `Database`
/// constructors take care of this.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_TXN_QUEUE)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
    sqlx::query(CREATE_TXN_QUEUE_INDEX)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
    Ok(())
}
