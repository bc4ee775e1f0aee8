//! TEMPO Jobs - Scheduled Transition Processing
//!
//! Push-mode invalidation: a periodic job collects every transition that
//! happened since its previous run and hands each one to the active timing
//! strategy, which flushes the affected cache tags.
//!
//! ```ignore
//! use tokio::sync::watch;
//!
//! let config = TransitionJobConfig::from_env();
//! let job = Arc::new(TransitionJob::new(
//!     repository,
//!     strategies.timing,
//!     Arc::new(InMemoryRunStateStore::new()),
//!     Arc::new(SystemClock),
//!     config.clone(),
//! ));
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let handle = tokio::spawn(transition_job_task(job, config, shutdown_rx));
//!
//! let _ = shutdown_tx.send(true);
//! let metrics = handle.await?;
//! ```

pub mod config;
pub mod job;
pub mod run_state;
pub mod task;
pub mod telemetry;

pub use config::{
    TransitionJobConfig, DEFAULT_JOB_CHECK_INTERVAL_SECS, DEFAULT_JOB_INITIAL_LOOKBACK_SECS,
    DEFAULT_JOB_NAME,
};
pub use job::{RunSummary, TransitionJob, TransitionJobMetrics, TransitionJobSnapshot};
pub use run_state::{InMemoryRunStateStore, RunStateStore};
pub use task::transition_job_task;
pub use telemetry::{init_tracing, LogFormat, DEFAULT_LOG_FILTER};
