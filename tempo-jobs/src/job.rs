//! One pass of push-mode invalidation.

use crate::{RunStateStore, TransitionJobConfig};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempo_core::{Clock, TempoResult, Timestamp};
use tempo_storage::TemporalContentRepository;
use tempo_strategy::{TimingStrategy, TransitionOutcome};
use tracing::{debug, info, trace, warn};

// ============================================================================
// METRICS
// ============================================================================

/// Counters accumulated over the lifetime of a job.
#[derive(Debug, Default)]
pub struct TransitionJobMetrics {
    /// Transitions handed to the timing strategy
    pub processed: AtomicU64,

    /// Transitions whose tags were flushed
    pub flushed: AtomicU64,

    /// Transitions the strategy reported as failed
    pub failed: AtomicU64,

    /// Completed runs
    pub cycles: AtomicU64,

    /// Runs aborted before the watermark was recorded
    pub errors: AtomicU64,
}

impl TransitionJobMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TransitionJobSnapshot {
        TransitionJobSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TransitionJobMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransitionJobSnapshot {
    pub processed: u64,
    pub flushed: u64,
    pub failed: u64,
    pub cycles: u64,
    pub errors: u64,
}

// ============================================================================
// JOB
// ============================================================================

/// Result of a single [`TransitionJob::run_once`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Exclusive lower bound of the processed window
    pub window_start: Timestamp,
    /// Inclusive upper bound of the processed window
    pub window_end: Timestamp,
    pub processed: u64,
    pub flushed: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl RunSummary {
    fn empty(window_start: Timestamp, window_end: Timestamp) -> Self {
        Self {
            window_start,
            window_end,
            ..Self::default()
        }
    }
}

/// Feeds every transition since the previous run to a timing strategy.
pub struct TransitionJob {
    repository: TemporalContentRepository,
    timing: Arc<dyn TimingStrategy>,
    run_state: Arc<dyn RunStateStore>,
    clock: Arc<dyn Clock>,
    config: TransitionJobConfig,
    metrics: Arc<TransitionJobMetrics>,
}

impl TransitionJob {
    pub fn new(
        repository: TemporalContentRepository,
        timing: Arc<dyn TimingStrategy>,
        run_state: Arc<dyn RunStateStore>,
        clock: Arc<dyn Clock>,
        config: TransitionJobConfig,
    ) -> Self {
        Self {
            repository,
            timing,
            run_state,
            clock,
            config,
            metrics: Arc::new(TransitionJobMetrics::new()),
        }
    }

    pub fn config(&self) -> &TransitionJobConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<TransitionJobMetrics> {
        self.metrics.clone()
    }

    /// Run once with the job's clock.
    pub fn run(&self) -> TempoResult<RunSummary> {
        self.run_once(self.clock.now())
    }

    /// Process the transitions in `(last_run, now]` and advance the watermark.
    ///
    /// Individual transition failures are counted and do not stop the run.
    /// When reading the watermark or the transitions fails, the watermark is
    /// left untouched so the next run covers the same window again.
    pub fn run_once(&self, now: Timestamp) -> TempoResult<RunSummary> {
        let result = self.process_window(now);
        match &result {
            Ok(_) => {
                self.metrics.cycles.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                warn!(job = %self.config.name, error = %e, "Transition job run failed");
            }
        }
        result
    }

    fn process_window(&self, now: Timestamp) -> TempoResult<RunSummary> {
        let name = self.config.name.as_str();
        let last_run = self.run_state.last_run(name)?;
        let window_start = last_run
            .unwrap_or_else(|| now.saturating_sub(self.config.initial_lookback_secs()));

        if window_start >= now {
            trace!(job = name, last_run = window_start, now, "Nothing to process");
            return Ok(RunSummary::empty(window_start, now));
        }

        let events = self.repository.find_transitions_in_range(
            window_start,
            now,
            self.config.workspace_id,
            self.config.language_id,
        )?;

        let mut summary = RunSummary::empty(window_start, now);
        for event in &events {
            let outcome = self.timing.process_transition(event);
            summary.processed += 1;
            self.metrics.processed.fetch_add(1, Ordering::Relaxed);

            match &outcome {
                TransitionOutcome::Skipped => summary.skipped += 1,
                TransitionOutcome::Flushed { .. } => {
                    summary.flushed += 1;
                    self.metrics.flushed.fetch_add(1, Ordering::Relaxed);
                }
                TransitionOutcome::Failed { .. } => {
                    summary.failed += 1;
                    self.metrics.failed.fetch_add(1, Ordering::Relaxed);
                }
            }

            if self.config.log_transitions {
                debug!(
                    job = name,
                    collection = %event.content().collection_name,
                    id = event.content().id,
                    timestamp = event.timestamp(),
                    transition = %event.transition_type(),
                    outcome = ?outcome,
                    "Processed transition"
                );
            }
        }

        self.run_state.record_run(name, now)?;

        if summary.processed > 0 {
            info!(
                job = name,
                timing = self.timing.name(),
                window_start,
                window_end = now,
                processed = summary.processed,
                flushed = summary.flushed,
                failed = summary.failed,
                "Transition job run completed"
            );
        } else {
            trace!(job = name, "Transition job run completed with no transitions");
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryRunStateStore, DEFAULT_JOB_NAME};
    use tempo_core::{ManualClock, MonitorRegistry, TemporalContent, PAGES_COLLECTION};
    use tempo_storage::{MockContentStore, RecordingInvalidator};
    use tempo_strategy::{PerPageScoping, SchedulerTiming};

    const T: i64 = 1_700_000_000;

    struct Harness {
        store: Arc<MockContentStore>,
        invalidator: Arc<RecordingInvalidator>,
        run_state: Arc<InMemoryRunStateStore>,
        job: TransitionJob,
    }

    fn harness(contents: Vec<TemporalContent>) -> Harness {
        let store = Arc::new(MockContentStore::new());
        store.insert_all(contents).unwrap();
        let repository =
            TemporalContentRepository::new(store.clone(), Arc::new(MonitorRegistry::new()));
        let invalidator = Arc::new(RecordingInvalidator::new());
        let timing = Arc::new(SchedulerTiming::new(
            Arc::new(PerPageScoping),
            invalidator.clone(),
        ));
        let run_state = Arc::new(InMemoryRunStateStore::new());
        let job = TransitionJob::new(
            repository,
            timing,
            run_state.clone(),
            Arc::new(ManualClock::new(T)),
            TransitionJobConfig::default(),
        );
        Harness {
            store,
            invalidator,
            run_state,
            job,
        }
    }

    #[test]
    fn test_first_run_uses_initial_lookback() {
        let h = harness(vec![
            TemporalContent::page(1, 0).with_start_time(Some(T - 600)),
            TemporalContent::page(2, 0).with_start_time(Some(T - 7_200)),
        ]);

        let summary = h.job.run_once(T).unwrap();

        assert_eq!(summary.window_start, T - 3_600);
        assert_eq!(summary.window_end, T);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.flushed, 1);
        assert_eq!(h.run_state.last_run(DEFAULT_JOB_NAME).unwrap(), Some(T));
    }

    #[test]
    fn test_second_run_starts_at_watermark() {
        let h = harness(vec![
            TemporalContent::page(1, 0).with_start_time(Some(T)),
            TemporalContent::page(2, 0).with_start_time(Some(T + 30)),
        ]);

        assert_eq!(h.job.run_once(T).unwrap().processed, 1);
        let summary = h.job.run_once(T + 60).unwrap();

        assert_eq!(summary.window_start, T);
        assert_eq!(summary.processed, 1);
        assert_eq!(h.invalidator.flush_count(), 2);
    }

    #[test]
    fn test_repeated_instant_processes_nothing() {
        let h = harness(vec![TemporalContent::page(1, 0).with_start_time(Some(T))]);
        h.job.run_once(T).unwrap();

        let summary = h.job.run_once(T).unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(h.invalidator.flush_count(), 1);
    }

    #[test]
    fn test_flush_failures_do_not_stop_the_run() {
        let h = harness(vec![
            TemporalContent::page(1, 0).with_start_time(Some(T - 20)),
            TemporalContent::page(2, 0).with_start_time(Some(T - 10)),
        ]);
        h.invalidator.set_failing(true);

        let summary = h.job.run_once(T).unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(h.run_state.last_run(DEFAULT_JOB_NAME).unwrap(), Some(T));
        assert_eq!(h.job.metrics().snapshot().failed, 2);
    }

    #[test]
    fn test_query_failure_keeps_watermark() {
        let h = harness(vec![TemporalContent::page(1, 0).with_start_time(Some(T - 10))]);
        h.run_state.record_run(DEFAULT_JOB_NAME, T - 100).unwrap();
        h.store.fail_collection(PAGES_COLLECTION).unwrap();

        assert!(h.job.run_once(T).is_err());
        assert_eq!(h.run_state.last_run(DEFAULT_JOB_NAME).unwrap(), Some(T - 100));

        let snapshot = h.job.metrics().snapshot();
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.cycles, 0);
    }

    #[test]
    fn test_run_uses_clock() {
        let h = harness(vec![TemporalContent::page(1, 0).with_end_time(Some(T))]);
        let summary = h.job.run().unwrap();
        assert_eq!(summary.window_end, T);
        assert_eq!(summary.flushed, 1);
    }

    #[test]
    fn test_metrics_accumulate_across_runs() {
        let h = harness(vec![
            TemporalContent::page(1, 0).with_start_time(Some(T - 10)),
            TemporalContent::page(2, 0).with_start_time(Some(T + 10)),
        ]);
        h.job.run_once(T).unwrap();
        h.job.run_once(T + 20).unwrap();

        assert_eq!(
            h.job.metrics().snapshot(),
            TransitionJobSnapshot {
                processed: 2,
                flushed: 2,
                failed: 0,
                cycles: 2,
                errors: 0,
            }
        );
    }
}
