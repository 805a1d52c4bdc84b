//! Job handler trait and execution context.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use minthub_core::{Job, JobKind, Result};

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    /// The job payload.
    pub fn payload(&self) -> &JsonValue {
        &self.job.payload
    }

    /// A string field of the payload, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.job.payload.get(key).and_then(|value| value.as_str())
    }
}

/// Trait for per-kind job handlers.
///
/// A handler validates its payload synchronously before doing any
/// external work, then performs (or mocks) the chain operation. Errors
/// are recorded on the job and drive the executor's retry-vs-fail
/// decision; handlers never talk to the store themselves.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job kind this handler processes.
    fn kind(&self) -> JobKind;

    /// Execute the job and produce its result payload.
    async fn execute(&self, ctx: JobContext) -> Result<JsonValue>;
}

/// No-op handler for testing.
pub struct NoOpHandler {
    kind: JobKind,
}

impl NoOpHandler {
    /// Create a new no-op handler for the given job kind.
    pub fn new(kind: JobKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl JobHandler for NoOpHandler {
    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn execute(&self, _ctx: JobContext) -> Result<JsonValue> {
        Ok(json!({"ok": true}))
    }
}
