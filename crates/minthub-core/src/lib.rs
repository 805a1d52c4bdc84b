//! # minthub-core
//!
//! Core types, traits, and abstractions for the minthub token
//! administration backend.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other minthub crates depend on: the [`Job`]
//! record and its lifecycle types, the [`JobStore`] persistence seam,
//! the [`ChainGateway`] submission seam, the shared error taxonomy,
//! and centralized default constants.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::{
    CallArg, ChainTransaction, Job, JobKind, JobStatus, MoveCall, QueueStats, SubmitReceipt,
    TokenAmount,
};
pub use traits::{ChainGateway, JobStore};
