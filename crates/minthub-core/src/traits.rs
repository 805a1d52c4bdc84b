//! Trait definitions for the persistence and chain-submission seams.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChainTransaction, Job, QueueStats, SubmitReceipt};

// =============================================================================
// JOB STORE
// =============================================================================

/// Durable store for transaction jobs.
///
/// Producers, the executor, and the inspection surface interact only
/// through this trait; job fields are never mutated directly. The store
/// owns the retention policy and the atomic claim.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in `queued` status with `attempts = 0` and
    /// `next_run_at = now`, then prune the oldest records past the
    /// retention limit. Fails with `InvalidInput` if `kind` is empty.
    /// A missing or null payload defaults to an empty object.
    ///
    /// Returns the full record so callers can display it immediately.
    async fn enqueue(&self, kind: &str, payload: Option<JsonValue>) -> Result<Job>;

    /// Atomically claim the oldest job with `status = queued` and
    /// `next_run_at <= now`: transition it to `processing`, increment
    /// `attempts`, touch `updated_at`, and return it, all in one
    /// indivisible step. Returns `None` when nothing is eligible.
    ///
    /// This is the only path by which a job becomes `processing`.
    /// Concurrent callers never receive the same job.
    async fn take_next(&self) -> Result<Option<Job>>;

    /// Fetch a job by id. `None` for unknown ids, never an error.
    async fn get(&self, id: Uuid) -> Result<Option<Job>>;

    /// List jobs, most recently created first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>>;

    /// Set `status = completed`, store the result, clear the error.
    /// No-op (returns `None`) for unknown ids.
    async fn mark_completed(&self, id: Uuid, result: JsonValue) -> Result<Option<Job>>;

    /// Set `status = failed` and record the error message verbatim.
    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<Option<Job>>;

    /// Return the job to `queued`, record the error, and push
    /// `next_run_at` to now plus the retry delay. The job becomes
    /// claimable again only after the delay elapses.
    async fn retry_later(&self, id: Uuid, error: &str) -> Result<Option<Job>>;

    /// Explicitly remove a job. Returns whether a row was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Delete oldest-created jobs, irrespective of status, until the
    /// record count is within the retention limit. Returns the number
    /// of rows removed.
    async fn prune(&self) -> Result<u64>;

    /// Count of jobs currently in `queued` status.
    async fn queued_count(&self) -> Result<i64>;

    /// Aggregate status counters.
    async fn queue_stats(&self) -> Result<QueueStats>;
}

// =============================================================================
// CHAIN GATEWAY
// =============================================================================

/// Backend that encodes, signs, and submits a transaction to the chain.
///
/// The executor and handlers treat this as opaque: they build a call
/// description and receive a receipt. Failures surface as
/// `Error::Chain` and flow through the job retry policy.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Submit a transaction and wait for its receipt. `label` names the
    /// originating operation for the receipt and logs.
    async fn submit(&self, txn: ChainTransaction, label: &str) -> Result<SubmitReceipt>;
}
