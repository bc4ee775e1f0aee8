//! Persistence for the job's last-run watermark.

use std::collections::HashMap;
use std::sync::RwLock;
use tempo_core::{StorageError, TempoResult, Timestamp};

/// Where a job remembers how far it has processed.
pub trait RunStateStore: Send + Sync {
    /// Instant of the last completed run, `None` before the first one.
    fn last_run(&self, job: &str) -> TempoResult<Option<Timestamp>>;

    /// Record `at` as the end of the last completed run.
    fn record_run(&self, job: &str, at: Timestamp) -> TempoResult<()>;
}

/// Watermarks held in memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRunStateStore {
    runs: RwLock<HashMap<String, Timestamp>>,
}

impl InMemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing watermark for `job`.
    pub fn with_last_run(job: &str, at: Timestamp) -> Self {
        let mut runs = HashMap::new();
        runs.insert(job.to_string(), at);
        Self {
            runs: RwLock::new(runs),
        }
    }

    pub fn clear(&self) -> TempoResult<()> {
        self.runs.write().map_err(|_| StorageError::LockPoisoned)?.clear();
        Ok(())
    }
}

impl RunStateStore for InMemoryRunStateStore {
    fn last_run(&self, job: &str) -> TempoResult<Option<Timestamp>> {
        let runs = self.runs.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(runs.get(job).copied())
    }

    fn record_run(&self, job: &str, at: Timestamp) -> TempoResult<()> {
        let mut runs = self.runs.write().map_err(|_| StorageError::LockPoisoned)?;
        runs.insert(job.to_string(), at);
        Ok(())
    }
}
