//! Timing strategies: when cached pages are invalidated.
//!
//! Pull strategies bound the lifetime of a rendered page; push strategies
//! flush tags as transitions are detected by the scheduled job.

mod dynamic;
mod hybrid;
mod scheduler;

pub use dynamic::{DynamicTiming, MIN_CACHE_LIFETIME};
pub use hybrid::HybridTiming;
pub use scheduler::SchedulerTiming;

use crate::{RenderContext, ScopingStrategy};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tempo_core::{Clock, ConfigError, ContentType, TempoConfig, TempoError, TransitionEvent};
use tempo_storage::{CacheInvalidator, TemporalContentRepository};
use tracing::warn;

pub const DYNAMIC_TIMING: &str = "dynamic";
pub const SCHEDULER_TIMING: &str = "scheduler";
pub const HYBRID_TIMING: &str = "hybrid";

/// Result of feeding one transition to a timing strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The strategy does not react to pushed transitions.
    Skipped,
    /// These tags were flushed.
    Flushed { tags: BTreeSet<String> },
    /// Processing failed; the error was logged and swallowed.
    Failed { error: TempoError },
}

impl TransitionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TransitionOutcome::Failed { .. })
    }
}

/// Policy deciding how cached pages follow content transitions.
pub trait TimingStrategy: Send + Sync {
    /// Identifier used in configuration and by the factory.
    fn name(&self) -> &'static str;

    fn handles_content_type(&self, content_type: ContentType) -> bool;

    /// Push path. Never returns an error: failures are reported as
    /// [`TransitionOutcome::Failed`] so a batch can keep going.
    fn process_transition(&self, event: &TransitionEvent) -> TransitionOutcome;

    /// Pull path. Seconds the page being rendered may be cached, `None`
    /// for "until explicitly flushed".
    fn cache_lifetime(&self, context: &mut RenderContext) -> Option<u64>;
}

/// Registry of timing strategies selected by name.
#[derive(Default)]
pub struct TimingStrategyFactory {
    strategies: Vec<Arc<dyn TimingStrategy>>,
}

impl TimingStrategyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory holding the dynamic, scheduler and hybrid strategies, in that order.
    pub fn standard(
        config: &TempoConfig,
        repository: TemporalContentRepository,
        clock: Arc<dyn Clock>,
        scoping: Arc<dyn ScopingStrategy>,
        invalidator: Arc<dyn CacheInvalidator>,
    ) -> Self {
        let dynamic: Arc<dyn TimingStrategy> = Arc::new(DynamicTiming::new(
            repository,
            clock,
            config.max_cache_lifetime(),
        ));
        let scheduler: Arc<dyn TimingStrategy> =
            Arc::new(SchedulerTiming::new(scoping, invalidator));

        let mut rules = BTreeMap::new();
        for content_type in [ContentType::Page, ContentType::Content] {
            if let Some(rule) = config.timing_rule(content_type) {
                rules.insert(content_type, rule.to_string());
            }
        }
        let hybrid = HybridTiming::new(rules, vec![dynamic.clone(), scheduler.clone()]);

        let mut factory = Self::new();
        factory.register(dynamic);
        factory.register(scheduler);
        factory.register(Arc::new(hybrid));
        factory
    }

    pub fn register(&mut self, strategy: Arc<dyn TimingStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategies(&self) -> &[Arc<dyn TimingStrategy>] {
        &self.strategies
    }

    /// The strategy called `name`, else the first registered one.
    pub fn select(&self, name: &str) -> Result<Arc<dyn TimingStrategy>, ConfigError> {
        if let Some(strategy) = self.strategies.iter().find(|s| s.name() == name) {
            return Ok(strategy.clone());
        }

        let first = self
            .strategies
            .first()
            .ok_or_else(|| ConfigError::NoStrategiesRegistered {
                kind: "timing".to_string(),
            })?;
        warn!(
            requested = name,
            fallback = first.name(),
            "Unknown timing strategy, using first registered"
        );
        Ok(first.clone())
    }
}
