//! In-memory job store test double.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use minthub_core::defaults::{TXN_MAX_RECORDS, TXN_RETRY_DELAY_MS};
use minthub_core::{Error, Job, JobStatus, JobStore, QueueStats, Result};

/// Mutex-guarded, insertion-ordered implementation of [`JobStore`].
///
/// Satisfies the same contract as [`crate::SqliteJobStore`]: the vec's
/// insertion order is the creation order, and the mutex serializes
/// claims. This is a test double, not a durability option; production
/// code always runs on the SQLite store.
///
/// Compiled unconditionally so dependent crates' tests can use it.
#[derive(Clone)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<Vec<Job>>>,
    max_records: usize,
    retry_delay_ms: i64,
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryJobStore {
    /// Create a store with default retention and retry delay.
    pub fn new() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Vec::new())),
            max_records: TXN_MAX_RECORDS as usize,
            retry_delay_ms: TXN_RETRY_DELAY_MS,
        }
    }

    /// Set the retention limit.
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Set the retry delay in milliseconds.
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: i64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune_locked(jobs: &mut Vec<Job>, max_records: usize) -> u64 {
        if jobs.len() <= max_records {
            return 0;
        }
        let excess = jobs.len() - max_records;
        jobs.drain(0..excess);
        excess as u64
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, kind: &str, payload: Option<JsonValue>) -> Result<Job> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(Error::InvalidInput("transaction type is required".into()));
        }

        let payload = match payload {
            None | Some(JsonValue::Null) => json!({}),
            Some(value) => value,
        };

        let now = Utc::now();
        let job = Job {
            id: Uuid::now_v7(),
            kind: kind.to_string(),
            payload,
            status: JobStatus::Queued,
            attempts: 0,
            error: None,
            result: None,
            next_run_at: now.timestamp_millis(),
            created_at: now,
            updated_at: now,
        };

        let mut jobs = self.lock();
        jobs.push(job.clone());
        Self::prune_locked(&mut jobs, self.max_records);
        Ok(job)
    }

    async fn take_next(&self) -> Result<Option<Job>> {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        let mut jobs = self.lock();
        // Insertion order is creation order, so a linear scan yields
        // the FIFO-eligible job. The mutex makes the claim atomic.
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Queued && job.next_run_at <= now_ms)
        else {
            return Ok(None);
        };

        job.status = JobStatus::Processing;
        job.attempts += 1;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.lock().iter().find(|job| job.id == id).cloned())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>> {
        let limit = limit.max(0) as usize;
        Ok(self.lock().iter().rev().take(limit).cloned().collect())
    }

    async fn mark_completed(&self, id: Uuid, result: JsonValue) -> Result<Option<Job>> {
        let mut jobs = self.lock();
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            return Ok(None);
        };
        job.status = JobStatus::Completed;
        job.result = Some(result);
        job.error = None;
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<Option<Job>> {
        let mut jobs = self.lock();
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            return Ok(None);
        };
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn retry_later(&self, id: Uuid, error: &str) -> Result<Option<Job>> {
        let now = Utc::now();
        let mut jobs = self.lock();
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            return Ok(None);
        };
        job.status = JobStatus::Queued;
        job.error = Some(error.to_string());
        job.next_run_at = now.timestamp_millis() + self.retry_delay_ms;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|job| job.id != id);
        Ok(jobs.len() < before)
    }

    async fn prune(&self) -> Result<u64> {
        let mut jobs = self.lock();
        Ok(Self::prune_locked(&mut jobs, self.max_records))
    }

    async fn queued_count(&self) -> Result<i64> {
        Ok(self
            .lock()
            .iter()
            .filter(|job| job.status == JobStatus::Queued)
            .count() as i64)
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let jobs = self.lock();
        let count = |status: JobStatus| jobs.iter().filter(|job| job.status == status).count() as i64;
        Ok(QueueStats {
            queued: count(JobStatus::Queued),
            processing: count(JobStatus::Processing),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
            total: jobs.len() as i64,
        })
    }
}
