use super::{TimingStrategy, TransitionOutcome, DYNAMIC_TIMING};
use crate::RenderContext;
use std::sync::Arc;
use tempo_core::{Clock, ContentType, TransitionEvent};
use tempo_storage::TemporalContentRepository;
use tracing::warn;

/// Lifetime used when the computed value is not positive.
pub const MIN_CACHE_LIFETIME: u64 = 60;

/// Pull-based timing: cached pages expire at the next transition.
pub struct DynamicTiming {
    repository: TemporalContentRepository,
    clock: Arc<dyn Clock>,
    max_lifetime: u64,
}

impl DynamicTiming {
    pub fn new(
        repository: TemporalContentRepository,
        clock: Arc<dyn Clock>,
        max_lifetime: u64,
    ) -> Self {
        Self {
            repository,
            clock,
            max_lifetime,
        }
    }

    pub fn max_lifetime(&self) -> u64 {
        self.max_lifetime
    }
}

impl TimingStrategy for DynamicTiming {
    fn name(&self) -> &'static str {
        DYNAMIC_TIMING
    }

    fn handles_content_type(&self, _content_type: ContentType) -> bool {
        true
    }

    /// Expiry takes care of invalidation.
    fn process_transition(&self, _event: &TransitionEvent) -> TransitionOutcome {
        TransitionOutcome::Skipped
    }

    fn cache_lifetime(&self, context: &mut RenderContext) -> Option<u64> {
        let now = self.clock.now();
        let (workspace_id, language_id) = (context.workspace_id(), context.language_id());

        let next = match self.repository.next_transition(
            now,
            workspace_id,
            language_id,
            context.transition_cache_mut(),
        ) {
            Ok(next) => next,
            Err(e) => {
                warn!(
                    workspace_id,
                    language_id,
                    error = %e,
                    "Next transition lookup failed, using minimum cache lifetime"
                );
                return Some(MIN_CACHE_LIFETIME);
            }
        };

        let lifetime = match next {
            None => return Some(self.max_lifetime),
            Some(next) => next.saturating_sub(now),
        };
        if lifetime <= 0 {
            return Some(MIN_CACHE_LIFETIME);
        }
        Some((lifetime as u64).min(self.max_lifetime))
    }
}
