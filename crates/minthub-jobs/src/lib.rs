//! # minthub-jobs
//!
//! Transaction job executor for minthub.
//!
//! This crate provides:
//! - A single-worker polling executor over any [`minthub_core::JobStore`]
//! - Per-kind job handlers behind a registry (mint, burn, distribute,
//!   freeze_wallet, transfer)
//! - Retry-vs-fail policy with a fixed retry delay and bounded attempts
//! - A dry-run mode that synthesizes deterministic mock results
//! - An HTTP chain gateway for live submission
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use minthub_db::Database;
//! use minthub_jobs::{ChainEnv, ExecutorBuilder, ExecutorConfig, HttpGateway};
//!
//! let db = Database::connect("sqlite://data/minthub.sqlite").await?;
//! let config = ExecutorConfig::from_env();
//! let env = Arc::new(ChainEnv::new(config.clone(), Arc::new(HttpGateway::from_env())));
//!
//! let executor = ExecutorBuilder::new(Arc::new(db.jobs.clone()))
//!     .with_config(config)
//!     .with_handlers(env.handlers())
//!     .build();
//!
//! // Start the worker and get a handle
//! let handle = executor.start();
//!
//! // ... later, on shutdown:
//! handle.shutdown().await;
//! ```

pub mod executor;
pub mod gateway;
pub mod handler;
pub mod handlers;

// Re-export core types
pub use minthub_core::*;

pub use executor::{
    ExecutorBuilder, ExecutorConfig, ExecutorEvent, ExecutorHandle, JobExecutor,
};
pub use gateway::HttpGateway;
pub use handler::{JobContext, JobHandler, NoOpHandler};
pub use handlers::{
    BurnHandler, ChainEnv, DistributeHandler, FreezeWalletHandler, MintHandler, TransferHandler,
};
