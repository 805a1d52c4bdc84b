//! # minthub-db
//!
//! SQLite persistence layer for minthub.
//!
//! This crate provides:
//! - Connection pool management with the pragmas the store relies on
//! - Idempotent schema bootstrap
//! - [`SqliteJobStore`], the durable transaction job store
//! - [`MemoryJobStore`], an in-memory test double behind the same trait
//!
//! ## Example
//!
//! ```rust,ignore
//! use minthub_core::JobStore;
//! use minthub_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://data/minthub.sqlite").await?;
//!
//!     let job = db
//!         .jobs
//!         .enqueue("mint", Some(serde_json::json!({"amount": "1000"})))
//!         .await?;
//!
//!     println!("Queued job: {}", job.id);
//!     Ok(())
//! }
//! ```

pub mod jobs;
pub mod memory;
pub mod pool;
pub mod schema;

// Re-export core types
pub use minthub_core::*;

pub use jobs::SqliteJobStore;
pub use memory::MemoryJobStore;
pub use pool::{create_memory_pool, create_pool, create_pool_with_config, PoolConfig};
pub use schema::init_schema;

use sqlx::SqlitePool;

/// Combined database context.
///
/// Bundles the connection pool with the stores that live on it, so the
/// API layer and `main` pass one handle around instead of wiring pools
/// into each repository.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    /// Transaction job store.
    pub jobs: SqliteJobStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    ///
    /// The caller is responsible for having bootstrapped the schema;
    /// the `connect` constructors do this automatically.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            jobs: SqliteJobStore::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the given SQLite URL and bootstrap the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        init_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        init_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Create an isolated in-memory database (for tests).
    pub async fn in_memory() -> Result<Self> {
        let pool = create_memory_pool().await?;
        init_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
