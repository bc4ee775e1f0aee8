//! Background task driving [`TransitionJob`] on an interval.

use crate::{TransitionJob, TransitionJobConfig, TransitionJobMetrics};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Run `job` every `config.check_interval` until shutdown is signalled.
///
/// Each run executes on the blocking pool because content stores and cache
/// invalidators are synchronous. Failed runs are logged and retried on the
/// next tick.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(transition_job_task(job, config, shutdown_rx));
///
/// // Later, trigger shutdown
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn transition_job_task(
    job: Arc<TransitionJob>,
    config: TransitionJobConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<TransitionJobMetrics> {
    let metrics = job.metrics();

    let mut check_interval = interval(config.check_interval);
    check_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        job = %config.name,
        check_interval_secs = config.check_interval.as_secs(),
        workspace_id = config.workspace_id,
        language_id = config.language_id,
        "Transition job task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender also means shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!(job = %config.name, "Transition job task shutting down");
                    break;
                }
            }

            _ = check_interval.tick() => {
                let job = job.clone();
                // Run errors are logged by the job itself.
                if let Err(e) = tokio::task::spawn_blocking(move || job.run()).await {
                    tracing::error!(job = %config.name, error = %e, "Transition job run panicked");
                }
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        job = %config.name,
        processed = snapshot.processed,
        flushed = snapshot.flushed,
        failed = snapshot.failed,
        cycles = snapshot.cycles,
        errors = snapshot.errors,
        "Transition job task completed"
    );

    metrics
}
