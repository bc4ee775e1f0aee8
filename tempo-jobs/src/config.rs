//! Configuration for the scheduled transition job.

use std::time::Duration;

/// Seconds between two job runs.
pub const DEFAULT_JOB_CHECK_INTERVAL_SECS: u64 = 60;

/// How far back the very first run looks when no watermark exists yet.
pub const DEFAULT_JOB_INITIAL_LOOKBACK_SECS: u64 = 3_600;

/// Key under which the job stores its last-run watermark.
pub const DEFAULT_JOB_NAME: &str = "tempo-transition-job";

/// Configuration for the transition job and its background task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionJobConfig {
    /// Job name, used as the watermark key (default: `tempo-transition-job`)
    pub name: String,

    /// How often the background task runs the job (default: 60 seconds)
    pub check_interval: Duration,

    /// Window of the first run, before any watermark exists (default: 1 hour)
    pub initial_lookback: Duration,

    /// Workspace whose transitions are processed (default: 0, live)
    pub workspace_id: i64,

    /// Language whose transitions are processed (default: 0)
    pub language_id: i64,

    /// Whether to log each processed transition (default: false)
    pub log_transitions: bool,
}

impl Default for TransitionJobConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_JOB_NAME.to_string(),
            check_interval: Duration::from_secs(DEFAULT_JOB_CHECK_INTERVAL_SECS),
            initial_lookback: Duration::from_secs(DEFAULT_JOB_INITIAL_LOOKBACK_SECS),
            workspace_id: 0,
            language_id: 0,
            log_transitions: false,
        }
    }
}

impl TransitionJobConfig {
    /// Create TransitionJobConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `TEMPO_JOB_NAME`: Watermark key (default: `tempo-transition-job`)
    /// - `TEMPO_JOB_CHECK_INTERVAL_SECS`: Seconds between runs (default: 60)
    /// - `TEMPO_JOB_INITIAL_LOOKBACK_SECS`: First-run window (default: 3600)
    /// - `TEMPO_JOB_WORKSPACE_ID`: Workspace to process (default: 0)
    /// - `TEMPO_JOB_LANGUAGE_ID`: Language to process (default: 0)
    /// - `TEMPO_JOB_LOG_TRANSITIONS`: Log each transition (default: false)
    ///
    /// Unparsable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let name = std::env::var("TEMPO_JOB_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.name);

        let check_interval = Duration::from_secs(
            std::env::var("TEMPO_JOB_CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_JOB_CHECK_INTERVAL_SECS),
        );

        let initial_lookback = Duration::from_secs(
            std::env::var("TEMPO_JOB_INITIAL_LOOKBACK_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_JOB_INITIAL_LOOKBACK_SECS),
        );

        let workspace_id = std::env::var("TEMPO_JOB_WORKSPACE_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|id: &i64| *id >= 0)
            .unwrap_or(defaults.workspace_id);

        let language_id = std::env::var("TEMPO_JOB_LANGUAGE_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|id: &i64| *id >= -1)
            .unwrap_or(defaults.language_id);

        let log_transitions = std::env::var("TEMPO_JOB_LOG_TRANSITIONS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            name,
            check_interval,
            initial_lookback,
            workspace_id,
            language_id,
            log_transitions,
        }
    }

    /// Short intervals for local development.
    pub fn development() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
            initial_lookback: Duration::from_secs(600),
            log_transitions: true,
            ..Self::default()
        }
    }

    /// Lookback in whole seconds, saturated to the timestamp range.
    pub fn initial_lookback_secs(&self) -> i64 {
        i64::try_from(self.initial_lookback.as_secs()).unwrap_or(i64::MAX)
    }
}
