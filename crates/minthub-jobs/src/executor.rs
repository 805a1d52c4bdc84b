//! The transaction job executor: a single polling worker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use minthub_core::defaults::{
    DEFAULT_GAS_BUDGET, EVENT_BUS_CAPACITY, EXECUTOR_MAX_ATTEMPTS, EXECUTOR_POLL_INTERVAL_MS,
    TOKEN_MODULE,
};
use minthub_core::{Error, Job, JobKind, JobStore, Result};

use crate::handler::{JobContext, JobHandler};

/// Kinds eligible for retry after a transient failure.
///
/// `transfer` is deliberately absent: a transfer that may already have
/// landed cannot be safely re-submitted. Unknown kinds are never
/// retryable.
const RETRYABLE_KINDS: &[JobKind] = &[
    JobKind::Mint,
    JobKind::Burn,
    JobKind::Distribute,
    JobKind::FreezeWallet,
];

pub(crate) fn is_retryable(kind: &str) -> bool {
    JobKind::parse(kind).is_some_and(|kind| RETRYABLE_KINDS.contains(&kind))
}

/// Configuration for the job executor.
///
/// The chain identifiers are opaque to the queue logic; they gate
/// `start()` and are consumed by the handlers.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum attempts before a retryable job is marked failed.
    pub max_attempts: i64,
    /// Skip chain submission and synthesize mock results.
    pub dry_run: bool,
    /// On-chain package id.
    pub package_id: Option<String>,
    /// On-chain token module name.
    pub module_name: String,
    /// Treasury capability object id.
    pub treasury_cap_id: Option<String>,
    /// Admin capability object id (freeze operations).
    pub admin_cap_id: Option<String>,
    /// Wallet registry object id (freeze operations).
    pub registry_id: Option<String>,
    /// Gas budget per submitted transaction.
    pub gas_budget: u64,
    /// Address transactions are signed and sent from.
    pub signer_address: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: EXECUTOR_POLL_INTERVAL_MS,
            max_attempts: EXECUTOR_MAX_ATTEMPTS,
            dry_run: false,
            package_id: None,
            module_name: TOKEN_MODULE.to_string(),
            treasury_cap_id: None,
            admin_cap_id: None,
            registry_id: None,
            gas_budget: DEFAULT_GAS_BUDGET,
            signer_address: None,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

impl ExecutorConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `MINTHUB_POLL_INTERVAL_MS` | `3000` | Polling interval |
    /// | `MINTHUB_MAX_ATTEMPTS` | `3` | Attempts before permanent failure |
    /// | `MINTHUB_EXECUTOR_DRY_RUN` | `false` | Mock results instead of submitting |
    /// | `MINTHUB_PACKAGE_ID` | — | On-chain package id |
    /// | `MINTHUB_MODULE` | `managed_token` | Token module name |
    /// | `MINTHUB_TREASURY_CAP_ID` | — | Treasury capability id |
    /// | `MINTHUB_ADMIN_CAP_ID` | — | Admin capability id |
    /// | `MINTHUB_REGISTRY_ID` | — | Wallet registry id |
    /// | `MINTHUB_GAS_BUDGET` | `10000000` | Gas budget per transaction |
    /// | `MINTHUB_SIGNER_ADDRESS` | — | Sending address |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval_ms: env_opt("MINTHUB_POLL_INTERVAL_MS")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            max_attempts: env_opt("MINTHUB_MAX_ATTEMPTS")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.max_attempts),
            dry_run: env_opt("MINTHUB_EXECUTOR_DRY_RUN")
                .map(|value| value == "true" || value == "1")
                .unwrap_or(false),
            package_id: env_opt("MINTHUB_PACKAGE_ID"),
            module_name: env_opt("MINTHUB_MODULE").unwrap_or(defaults.module_name),
            treasury_cap_id: env_opt("MINTHUB_TREASURY_CAP_ID"),
            admin_cap_id: env_opt("MINTHUB_ADMIN_CAP_ID"),
            registry_id: env_opt("MINTHUB_REGISTRY_ID"),
            gas_budget: env_opt("MINTHUB_GAS_BUDGET")
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.gas_budget),
            signer_address: env_opt("MINTHUB_SIGNER_ADDRESS"),
        }
    }

    /// Set the polling interval in milliseconds.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the maximum attempts before permanent failure.
    pub fn with_max_attempts(mut self, max_attempts: i64) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the on-chain package id.
    pub fn with_package_id(mut self, package_id: impl Into<String>) -> Self {
        self.package_id = Some(package_id.into());
        self
    }

    /// Set the treasury capability id.
    pub fn with_treasury_cap_id(mut self, treasury_cap_id: impl Into<String>) -> Self {
        self.treasury_cap_id = Some(treasury_cap_id.into());
        self
    }

    /// Set the admin capability id.
    pub fn with_admin_cap_id(mut self, admin_cap_id: impl Into<String>) -> Self {
        self.admin_cap_id = Some(admin_cap_id.into());
        self
    }

    /// Set the wallet registry id.
    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.registry_id = Some(registry_id.into());
        self
    }

    /// Set the signer address.
    pub fn with_signer_address(mut self, signer_address: impl Into<String>) -> Self {
        self.signer_address = Some(signer_address.into());
        self
    }

    /// Whether the executor has enough configuration to run.
    ///
    /// Dry-run needs the package and treasury ids so mocked targets are
    /// meaningful; live mode additionally needs a signer.
    pub fn is_configured(&self) -> bool {
        let base = self.package_id.is_some() && self.treasury_cap_id.is_some();
        if self.dry_run {
            base
        } else {
            base && self.signer_address.is_some()
        }
    }

    /// Fully-qualified call target for a function of the token module.
    pub fn target(&self, function: &str) -> Result<String> {
        let package = self
            .package_id
            .as_deref()
            .ok_or_else(|| Error::Config("package id is not configured".into()))?;
        Ok(format!("{package}::{}::{function}", self.module_name))
    }
}

/// Event emitted by the job executor.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    /// Executor started polling.
    Started,
    /// Executor stopped polling.
    Stopped,
    /// A job was claimed and dispatched.
    JobStarted { job_id: Uuid, kind: String },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, kind: String },
    /// A job failed and was scheduled for retry.
    JobRetried {
        job_id: Uuid,
        kind: String,
        attempt: i64,
    },
    /// A job failed permanently.
    JobFailed {
        job_id: Uuid,
        kind: String,
        error: String,
    },
}

/// Handle for controlling a running executor.
pub struct ExecutorHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<ExecutorEvent>,
}

impl ExecutorHandle {
    /// Signal the executor to stop polling. Idempotent; an in-flight
    /// handler call is awaited, not aborted.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    /// Get a receiver for executor events.
    pub fn events(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.event_rx.resubscribe()
    }
}

/// Single-worker executor that claims and runs transaction jobs.
///
/// The executor owns the retry-vs-fail decision; handlers only succeed
/// or error. At most one handler call is ever in flight: the loop
/// awaits each job before claiming the next, and sleeps the poll
/// interval only when the queue is empty.
pub struct JobExecutor {
    store: Arc<dyn JobStore>,
    config: ExecutorConfig,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    event_tx: broadcast::Sender<ExecutorEvent>,
}

impl JobExecutor {
    /// Create an executor with no handlers registered.
    pub fn new(store: Arc<dyn JobStore>, config: ExecutorConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            store,
            config,
            handlers: HashMap::new(),
            event_tx,
        }
    }

    /// Register a handler for its job kind. Later registrations of the
    /// same kind replace earlier ones.
    pub fn register_handler(&mut self, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(handler.kind().as_str().to_string(), handler);
    }

    /// The executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Get a receiver for executor events.
    pub fn events(&self) -> broadcast::Receiver<ExecutorEvent> {
        self.event_tx.subscribe()
    }

    /// Start polling and return a handle for control.
    ///
    /// If required chain configuration is missing the worker logs a
    /// warning and does not poll; the handle is still returned so
    /// shutdown remains uniform for callers.
    pub fn start(self) -> ExecutorHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let executor = Arc::new(self);
        tokio::spawn(async move {
            executor.run(&mut shutdown_rx).await;
        });

        ExecutorHandle {
            shutdown_tx,
            event_rx,
        }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.is_configured() {
            warn!(
                subsystem = "executor",
                component = "worker",
                dry_run = self.config.dry_run,
                "Missing chain configuration, worker not started"
            );
            return;
        }

        info!(
            subsystem = "executor",
            component = "worker",
            poll_interval_ms = self.config.poll_interval_ms,
            max_attempts = self.config.max_attempts,
            dry_run = self.config.dry_run,
            "Transaction executor started"
        );
        let _ = self.event_tx.send(ExecutorEvent::Started);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Transaction executor received shutdown signal");
                break;
            }

            match self.tick().await {
                // A job was processed; immediately look for the next one.
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("Transaction executor received shutdown signal");
                            break;
                        }
                        _ = sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(
                        subsystem = "executor",
                        component = "worker",
                        error = %e,
                        "Executor tick failed"
                    );
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = sleep(poll_interval) => {}
                    }
                }
            }
        }

        let _ = self.event_tx.send(ExecutorEvent::Stopped);
        info!("Transaction executor stopped");
    }

    /// Claim and process at most one job. Returns whether a job was
    /// processed. Store failures propagate; handler failures are
    /// absorbed into the job state.
    pub async fn tick(&self) -> Result<bool> {
        let Some(job) = self.store.take_next().await? else {
            return Ok(false);
        };
        self.process(job).await?;
        Ok(true)
    }

    /// Dispatch a job to its handler.
    pub async fn execute(&self, job: &Job) -> Result<JsonValue> {
        let Some(handler) = self.handlers.get(job.kind.as_str()) else {
            return Err(Error::UnsupportedType(job.kind.clone()));
        };
        handler.execute(JobContext::new(job.clone())).await
    }

    async fn process(&self, job: Job) -> Result<()> {
        let start = Instant::now();
        info!(
            subsystem = "executor",
            component = "worker",
            job_id = %job.id,
            job_kind = %job.kind,
            attempt = job.attempts,
            "Processing transaction job"
        );
        let _ = self.event_tx.send(ExecutorEvent::JobStarted {
            job_id: job.id,
            kind: job.kind.clone(),
        });

        match self.execute(&job).await {
            Ok(result) => {
                self.store.mark_completed(job.id, result).await?;
                info!(
                    job_id = %job.id,
                    job_kind = %job.kind,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Transaction job completed"
                );
                let _ = self.event_tx.send(ExecutorEvent::JobCompleted {
                    job_id: job.id,
                    kind: job.kind,
                });
            }
            Err(err) => {
                let message = err.to_string();
                // An unregistered kind never becomes supported mid-flight.
                let permanent = matches!(err, Error::UnsupportedType(_));
                // The claim already counted this attempt.
                let prior_attempts = job.attempts - 1;

                if !permanent
                    && is_retryable(&job.kind)
                    && prior_attempts < self.config.max_attempts
                {
                    self.store.retry_later(job.id, &message).await?;
                    warn!(
                        job_id = %job.id,
                        job_kind = %job.kind,
                        attempt = job.attempts,
                        error = %message,
                        "Transaction job failed, retry scheduled"
                    );
                    let _ = self.event_tx.send(ExecutorEvent::JobRetried {
                        job_id: job.id,
                        kind: job.kind,
                        attempt: job.attempts,
                    });
                } else {
                    self.store.mark_failed(job.id, &message).await?;
                    warn!(
                        job_id = %job.id,
                        job_kind = %job.kind,
                        attempt = job.attempts,
                        error = %message,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Transaction job failed permanently"
                    );
                    let _ = self.event_tx.send(ExecutorEvent::JobFailed {
                        job_id: job.id,
                        kind: job.kind,
                        error: message,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Builder for creating an executor with handlers.
pub struct ExecutorBuilder {
    store: Arc<dyn JobStore>,
    config: ExecutorConfig,
    handlers: Vec<Arc<dyn JobHandler>>,
}

impl ExecutorBuilder {
    /// Create a new executor builder.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            config: ExecutorConfig::default(),
            handlers: Vec::new(),
        }
    }

    /// Set the executor configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a handler.
    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Add a batch of handlers.
    pub fn with_handlers(mut self, handlers: Vec<Arc<dyn JobHandler>>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Build and return the executor.
    pub fn build(self) -> JobExecutor {
        let mut executor = JobExecutor::new(self.store, self.config);
        for handler in self.handlers {
            executor.register_handler(handler);
        }
        executor
    }
}
