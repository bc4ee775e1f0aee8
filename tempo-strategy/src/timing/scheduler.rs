use super::{TimingStrategy, TransitionOutcome, SCHEDULER_TIMING};
use crate::{RenderContext, ScopingStrategy};
use std::sync::Arc;
use tempo_core::{ContentType, TransitionError, TransitionEvent};
use tempo_storage::CacheInvalidator;
use tracing::{debug, error};

/// Push-based timing: pages stay cached until a detected transition
/// flushes their tags.
pub struct SchedulerTiming {
    scoping: Arc<dyn ScopingStrategy>,
    invalidator: Arc<dyn CacheInvalidator>,
}

impl SchedulerTiming {
    pub fn new(scoping: Arc<dyn ScopingStrategy>, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        Self {
            scoping,
            invalidator,
        }
    }
}

impl TimingStrategy for SchedulerTiming {
    fn name(&self) -> &'static str {
        SCHEDULER_TIMING
    }

    fn handles_content_type(&self, _content_type: ContentType) -> bool {
        true
    }

    fn process_transition(&self, event: &TransitionEvent) -> TransitionOutcome {
        let content = event.content();
        let context = RenderContext::for_event(event);

        let tags = match self.scoping.tags(content, &context) {
            Ok(tags) => tags,
            Err(e) => {
                error!(
                    collection = %content.collection_name,
                    id = content.id,
                    scoping = self.scoping.name(),
                    error = %e,
                    "Failed to resolve cache tags for transition"
                );
                return TransitionOutcome::Failed {
                    error: TransitionError::TagResolutionFailed {
                        collection: content.collection_name.clone(),
                        id: content.id,
                        reason: e.to_string(),
                    }
                    .into(),
                };
            }
        };
        if tags.is_empty() {
            return TransitionOutcome::Skipped;
        }

        if let Err(e) = self.invalidator.flush_by_tags(&tags) {
            error!(
                collection = %content.collection_name,
                id = content.id,
                tags = ?tags,
                error = %e,
                "Failed to flush cache tags for transition"
            );
            return TransitionOutcome::Failed {
                error: TransitionError::InvalidationFailed {
                    collection: content.collection_name.clone(),
                    id: content.id,
                    reason: e.to_string(),
                }
                .into(),
            };
        }

        debug!(
            collection = %content.collection_name,
            id = content.id,
            timestamp = event.timestamp(),
            transition = %event.transition_type(),
            tags = ?tags,
            "Flushed cache tags"
        );
        TransitionOutcome::Flushed { tags }
    }

    fn cache_lifetime(&self, _context: &mut RenderContext) -> Option<u64> {
        None
    }
}
