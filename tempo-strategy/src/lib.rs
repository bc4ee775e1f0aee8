//! TEMPO Strategy - Cache Scoping and Timing
//!
//! Scoping strategies decide which cache tags a transition invalidates;
//! timing strategies decide whether invalidation happens by bounded cache
//! lifetimes (pull) or by flushing detected transitions (push).

pub mod context;
pub mod resolver;
pub mod scoping;
pub mod timing;

pub use context::RenderContext;
pub use resolver::ReferenceResolver;
pub use scoping::{
    page_tag, scoping_strategy_from_config, GlobalScoping, PerContentScoping, PerPageScoping,
    ScopingStrategy, GLOBAL_SCOPING, GLOBAL_TAG, PER_CONTENT_SCOPING, PER_PAGE_SCOPING,
};
pub use timing::{
    DynamicTiming, HybridTiming, SchedulerTiming, TimingStrategy, TimingStrategyFactory,
    TransitionOutcome, DYNAMIC_TIMING, HYBRID_TIMING, MIN_CACHE_LIFETIME, SCHEDULER_TIMING,
};

use std::sync::Arc;
use tempo_core::{Clock, ConfigError, TempoConfig};
use tempo_storage::{CacheInvalidator, ReferenceIndex, TemporalContentRepository};
use tracing::info;

/// The active scoping and timing strategy for one configuration.
#[derive(Clone)]
pub struct Strategies {
    pub scoping: Arc<dyn ScopingStrategy>,
    pub timing: Arc<dyn TimingStrategy>,
}

impl Strategies {
    /// Build both strategies from `config`.
    ///
    /// An unknown scoping name is fatal. An unknown timing name falls back to
    /// the first standard strategy (`dynamic`).
    pub fn from_config(
        config: &TempoConfig,
        repository: TemporalContentRepository,
        index: Option<Arc<dyn ReferenceIndex>>,
        invalidator: Arc<dyn CacheInvalidator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver = index.map(|index| {
            Arc::new(ReferenceResolver::new(repository.store().clone(), index))
        });
        let scoping = scoping_strategy_from_config(config, resolver)?;
        let timing = TimingStrategyFactory::standard(
            config,
            repository,
            clock,
            scoping.clone(),
            invalidator,
        )
        .select(config.timing_strategy())?;

        info!(
            scoping = scoping.name(),
            timing = timing.name(),
            "Cache strategies configured"
        );
        Ok(Self { scoping, timing })
    }
}
