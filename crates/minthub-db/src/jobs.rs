//! Durable transaction job store.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use minthub_core::defaults::{TXN_MAX_RECORDS, TXN_RETRY_DELAY_MS};
use minthub_core::{Error, Job, JobStatus, JobStore, QueueStats, Result};

const JOB_COLUMNS: &str =
    "id, kind, payload, status, attempts, error, result, next_run_at, created_at, updated_at";

/// SQLite implementation of [`JobStore`].
///
/// Every mutation is a single statement, so SQLite's write
/// serialization is the only locking the store needs: two concurrent
/// `take_next` callers can never claim the same row.
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
    max_records: i64,
    retry_delay_ms: i64,
}

impl SqliteJobStore {
    /// Create a store with default retention and retry delay.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            max_records: TXN_MAX_RECORDS,
            retry_delay_ms: TXN_RETRY_DELAY_MS,
        }
    }

    /// Set the retention limit.
    pub fn with_max_records(mut self, max_records: i64) -> Self {
        self.max_records = max_records;
        self
    }

    /// Set the retry delay in milliseconds.
    pub fn with_retry_delay_ms(mut self, retry_delay_ms: i64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// The configured retry delay in milliseconds.
    pub fn retry_delay_ms(&self) -> i64 {
        self.retry_delay_ms
    }

    /// Current time truncated to microseconds, the stored precision.
    fn now() -> DateTime<Utc> {
        let now = Utc::now();
        now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now)
    }

    /// Fixed-precision RFC 3339, so text comparison is time comparison.
    fn format_ts(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| Error::Internal(format!("corrupt job timestamp '{raw}': {e}")))
    }

    /// Parse a job row into a Job struct.
    fn parse_job_row(row: &SqliteRow) -> Result<Job> {
        let id: String = row.get("id");
        let payload: String = row.get("payload");
        let status: String = row.get("status");
        let result: Option<String> = row.get("result");
        let created_at: String = row.get("created_at");
        let updated_at: String = row.get("updated_at");

        Ok(Job {
            id: Uuid::parse_str(&id).map_err(|e| Error::Internal(format!("corrupt job id: {e}")))?,
            kind: row.get("kind"),
            payload: serde_json::from_str(&payload)?,
            status: JobStatus::parse(&status),
            attempts: row.get("attempts"),
            error: row.get("error"),
            result: result.as_deref().map(serde_json::from_str).transpose()?,
            next_run_at: row.get("next_run_at"),
            created_at: Self::parse_ts(&created_at)?,
            updated_at: Self::parse_ts(&updated_at)?,
        })
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn enqueue(&self, kind: &str, payload: Option<JsonValue>) -> Result<Job> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(Error::InvalidInput("transaction type is required".into()));
        }

        let payload = match payload {
            None | Some(JsonValue::Null) => json!({}),
            Some(value) => value,
        };

        let now = Self::now();
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

        sqlx::query(
            "INSERT INTO txn_queue (id, kind, payload, status, attempts, error, result, next_run_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, ?6, ?7, ?8)",
        )
        .bind(job.id.to_string())
        .bind(&job.kind)
        .bind(job.payload.to_string())
        .bind(job.status.as_str())
        .bind(job.attempts)
        .bind(job.next_run_at)
        .bind(Self::format_ts(job.created_at))
        .bind(Self::format_ts(job.updated_at))
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.prune().await?;
        Ok(job)
    }

    async fn take_next(&self) -> Result<Option<Job>> {
        let now = Self::now();

        // Claim as one statement: select-eligible, mark-processing, and
        // increment-attempts are indivisible under SQLite's write lock.
        // Ties on created_at fall back to rowid, the insertion sequence.
        let sql = format!(
            "UPDATE txn_queue
                SET status = 'processing', attempts = attempts + 1, updated_at = ?1
              WHERE id = (
                  SELECT id FROM txn_queue
                   WHERE status = 'queued' AND next_run_at <= ?2
                   ORDER BY created_at ASC, rowid ASC
                   LIMIT 1
              )
          RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Self::format_ts(now))
            .bind(now.timestamp_millis())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM txn_queue WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM txn_queue
              ORDER BY created_at DESC, rowid DESC
              LIMIT ?1"
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_job_row).collect()
    }

    async fn mark_completed(&self, id: Uuid, result: JsonValue) -> Result<Option<Job>> {
        let sql = format!(
            "UPDATE txn_queue
                SET status = 'completed', result = ?1, error = NULL, updated_at = ?2
              WHERE id = ?3
          RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(result.to_string())
            .bind(Self::format_ts(Self::now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<Option<Job>> {
        let sql = format!(
            "UPDATE txn_queue
                SET status = 'failed', error = ?1, updated_at = ?2
              WHERE id = ?3
          RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(error)
            .bind(Self::format_ts(Self::now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn retry_later(&self, id: Uuid, error: &str) -> Result<Option<Job>> {
        let now = Self::now();
        let sql = format!(
            "UPDATE txn_queue
                SET status = 'queued', error = ?1, next_run_at = ?2, updated_at = ?3
              WHERE id = ?4
          RETURNING {JOB_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(error)
            .bind(now.timestamp_millis() + self.retry_delay_ms)
            .bind(Self::format_ts(now))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM txn_queue WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn prune(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM txn_queue
              WHERE rowid NOT IN (
                  SELECT rowid FROM txn_queue
                   ORDER BY created_at DESC, rowid DESC
                   LIMIT ?1
              )",
        )
        .bind(self.max_records)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let removed = result.rows_affected();
        if removed > 0 {
            debug!(
                subsystem = "db",
                component = "txn_store",
                op = "prune",
                row_count = removed,
                "Evicted oldest job records past retention limit"
            );
        }
        Ok(removed)
    }

    async fn queued_count(&self) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM txn_queue WHERE status = 'queued'")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(count)
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'queued') AS queued,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COUNT(*) AS total
             FROM txn_queue",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            queued: row.get::<i64, _>("queued"),
            processing: row.get::<i64, _>("processing"),
            completed: row.get::<i64, _>("completed"),
            failed: row.get::<i64, _>("failed"),
            total: row.get::<i64, _>("total"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::create_memory_pool;
    use crate::schema::init_schema;

    async fn test_store() -> SqliteJobStore {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool).await.unwrap();
        SqliteJobStore::new(pool)
    }

    #[tokio::test]
    async fn enqueue_creates_queued_job() {
        let store = test_store().await;

        let before = Utc::now().timestamp_millis();
        let job = store
            .enqueue("mint", Some(json!({"amount": "1000", "recipient": "0xtest"})))
            .await
            .unwrap();
        let after = Utc::now().timestamp_millis();

        assert_eq!(job.kind, "mint");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.error, None);
        assert_eq!(job.result, None);
        assert!(job.next_run_at >= before && job.next_run_at <= after);
        assert_eq!(job.payload["amount"], "1000");
    }

    #[tokio::test]
    async fn enqueue_defaults_payload_to_empty_object() {
        let store = test_store().await;

        let job = store.enqueue("mint", None).await.unwrap();
        assert_eq!(job.payload, json!({}));

        let job = store.enqueue("mint", Some(JsonValue::Null)).await.unwrap();
        assert_eq!(job.payload, json!({}));
    }

    #[tokio::test]
    async fn enqueue_rejects_missing_kind() {
        let store = test_store().await;

        for kind in ["", "   "] {
            let err = store.enqueue(kind, None).await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{err}");
            assert!(err.to_string().contains("transaction type is required"));
        }
    }

    #[tokio::test]
    async fn enqueued_ids_are_unique() {
        let store = test_store().await;

        let mut ids = std::collections::HashSet::new();
        for _ in 0..50 {
            let job = store.enqueue("mint", None).await.unwrap();
            assert!(ids.insert(job.id), "duplicate id {}", job.id);
        }
    }

    #[tokio::test]
    async fn round_trips_through_get() {
        let store = test_store().await;

        let job = store
            .enqueue("burn", Some(json!({"coinId": "0xcoin"})))
            .await
            .unwrap();
        let fetched = store.get(job.id).await.unwrap().unwrap();

        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.kind, job.kind);
        assert_eq!(fetched.payload, job.payload);
        assert_eq!(fetched.status, job.status);
        assert_eq!(fetched.created_at, job.created_at);
        assert_eq!(fetched.next_run_at, job.next_run_at);
    }

    #[tokio::test]
    async fn get_unknown_id_returns_none() {
        let store = test_store().await;
        assert!(store.get(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn take_next_claims_fifo() {
        let store = test_store().await;

        let a = store.enqueue("mint", None).await.unwrap();
        let b = store.enqueue("mint", None).await.unwrap();
        let c = store.enqueue("mint", None).await.unwrap();

        let first = store.take_next().await.unwrap().unwrap();
        let second = store.take_next().await.unwrap().unwrap();
        let third = store.take_next().await.unwrap().unwrap();

        assert_eq!(first.id, a.id);
        assert_eq!(second.id, b.id);
        assert_eq!(third.id, c.id);
        assert!(store.take_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn take_next_marks_processing_and_counts_attempt() {
        let store = test_store().await;

        let job = store.enqueue("mint", None).await.unwrap();
        let claimed = store.take_next().await.unwrap().unwrap();

        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.attempts, 1);
        assert!(claimed.updated_at >= job.updated_at);

        // The claim is reflected in storage, not just the returned record.
        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Processing);
        assert_eq!(stored.attempts, 1);
    }

    #[tokio::test]
    async fn take_next_on_empty_store_returns_none() {
        let store = test_store().await;
        assert!(store.take_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn take_next_skips_jobs_scheduled_in_the_future() {
        let store = test_store().await;

        let job = store.enqueue("mint", None).await.unwrap();
        store.retry_later(job.id, "transient").await.unwrap();

        assert!(store.take_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retry_delay_is_honored() {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool).await.unwrap();
        let store = SqliteJobStore::new(pool).with_retry_delay_ms(50);

        let job = store.enqueue("mint", None).await.unwrap();
        store.take_next().await.unwrap().unwrap();
        let retried = store.retry_later(job.id, "node down").await.unwrap().unwrap();

        assert_eq!(retried.status, JobStatus::Queued);
        assert_eq!(retried.error.as_deref(), Some("node down"));
        assert!(store.take_next().await.unwrap().is_none());

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        let claimed = store.take_next().await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.attempts, 2);
    }

    #[tokio::test]
    async fn retried_job_moves_behind_newer_jobs_only_by_creation_order() {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool).await.unwrap();
        let store = SqliteJobStore::new(pool).with_retry_delay_ms(0);

        let old = store.enqueue("mint", None).await.unwrap();
        store.take_next().await.unwrap();
        store.retry_later(old.id, "transient").await.unwrap();

        let newer = store.enqueue("mint", None).await.unwrap();

        // Ordering is by created_at, so the retried job still precedes
        // jobs created after it once eligible again.
        let first = store.take_next().await.unwrap().unwrap();
        let second = store.take_next().await.unwrap().unwrap();
        assert_eq!(first.id, old.id);
        assert_eq!(second.id, newer.id);
    }

    #[tokio::test]
    async fn mark_completed_sets_result_and_clears_error() {
        let store = test_store().await;

        let job = store.enqueue("mint", None).await.unwrap();
        store.take_next().await.unwrap();
        store.retry_later(job.id, "transient").await.unwrap();

        let result = json!({"digest": "0xabc123", "label": "mint"});
        let completed = store
            .mark_completed(job.id, result.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(completed.status, JobStatus::Completed);
        assert_eq!(completed.result, Some(result));
        assert_eq!(completed.error, None);
    }

    #[tokio::test]
    async fn mark_failed_preserves_message_verbatim() {
        let store = test_store().await;

        let job = store.enqueue("mint", None).await.unwrap();
        let failed = store
            .mark_failed(job.id, "Invalid amount: abc")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("Invalid amount: abc"));
    }

    #[tokio::test]
    async fn mark_operations_are_noops_for_unknown_ids() {
        let store = test_store().await;
        let missing = Uuid::now_v7();

        assert!(store.mark_completed(missing, json!({})).await.unwrap().is_none());
        assert!(store.mark_failed(missing, "err").await.unwrap().is_none());
        assert!(store.retry_later(missing, "err").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_operations_do_not_touch_attempts() {
        let store = test_store().await;

        let job = store.enqueue("mint", None).await.unwrap();
        store.take_next().await.unwrap();
        let retried = store.retry_later(job.id, "e").await.unwrap().unwrap();
        assert_eq!(retried.attempts, 1);

        let failed = store.mark_failed(job.id, "e").await.unwrap().unwrap();
        assert_eq!(failed.attempts, 1);

        let completed = store.mark_completed(job.id, json!({})).await.unwrap().unwrap();
        assert_eq!(completed.attempts, 1);
    }

    #[tokio::test]
    async fn terminal_states_are_never_claimed() {
        let store = test_store().await;

        let done = store.enqueue("mint", None).await.unwrap();
        store.take_next().await.unwrap();
        store.mark_completed(done.id, json!({})).await.unwrap();

        let dead = store.enqueue("mint", None).await.unwrap();
        store.take_next().await.unwrap();
        store.mark_failed(dead.id, "gone").await.unwrap();

        assert!(store.take_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_limited() {
        let store = test_store().await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let job = store
                .enqueue("mint", Some(json!({"amount": format!("{}", (i + 1) * 100)})))
                .await
                .unwrap();
            ids.push(job.id);
        }

        let listed = store.list_recent(3).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, ids[4]);
        assert_eq!(listed[1].id, ids[3]);
        assert_eq!(listed[2].id, ids[2]);
    }

    #[tokio::test]
    async fn retention_evicts_oldest_regardless_of_status() {
        let pool = create_memory_pool().await.unwrap();
        init_schema(&pool).await.unwrap();
        let store = SqliteJobStore::new(pool).with_max_records(5);

        let first = store.enqueue("mint", None).await.unwrap();
        store.take_next().await.unwrap();
        store.mark_completed(first.id, json!({})).await.unwrap();

        let mut ids = vec![first.id];
        for _ in 0..7 {
            ids.push(store.enqueue("mint", None).await.unwrap().id);
        }

        let listed = store.list_recent(100).await.unwrap();
        assert_eq!(listed.len(), 5);

        // Completed status does not protect the oldest records.
        for old_id in &ids[..3] {
            assert!(store.get(*old_id).await.unwrap().is_none());
        }
        for new_id in &ids[3..] {
            assert!(store.get(*new_id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn delete_removes_job() {
        let store = test_store().await;

        let job = store.enqueue("mint", None).await.unwrap();
        assert!(store.delete(job.id).await.unwrap());
        assert!(store.get(job.id).await.unwrap().is_none());
        assert!(!store.delete(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn queue_stats_counts_by_status() {
        let store = test_store().await;

        // Claims go oldest-first, so enqueue in settle order and leave
        // the last job queued.
        let completed = store.enqueue("mint", None).await.unwrap();
        let failed = store.enqueue("mint", None).await.unwrap();
        let processing = store.enqueue("mint", None).await.unwrap();
        store.enqueue("mint", None).await.unwrap();

        store.take_next().await.unwrap();
        store.mark_completed(completed.id, json!({})).await.unwrap();
        store.take_next().await.unwrap();
        store.mark_failed(failed.id, "boom").await.unwrap();
        let claimed = store.take_next().await.unwrap().unwrap();
        assert_eq!(claimed.id, processing.id);

        let stats = store.queue_stats().await.unwrap();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.processing, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total, 4);

        assert_eq!(store.queued_count().await.unwrap(), 1);
    }
}
