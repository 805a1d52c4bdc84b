//! # minthub-api
//!
//! HTTP surface for minthub: token operation producers and the job
//! inspection endpoints, over the shared [`minthub_db::Database`].
//!
//! The router is exposed as a library so integration tests can drive
//! it directly; the `minthub-api` binary wires configuration, the
//! database, and the executor around it.

pub mod error;
pub mod handlers;

pub use error::ApiError;
pub use handlers::{app, AppState};
