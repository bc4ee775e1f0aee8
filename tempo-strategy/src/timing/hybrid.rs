use super::{TimingStrategy, TransitionOutcome, DYNAMIC_TIMING, HYBRID_TIMING};
use crate::RenderContext;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempo_core::{ContentType, TransitionEvent};
use tracing::warn;

/// Delegates to another strategy per content type.
///
/// Unmapped content types use `dynamic`. Page rendering cannot tell which
/// content types are on the page, so the pull path always follows the page
/// rule.
pub struct HybridTiming {
    rules: BTreeMap<ContentType, String>,
    delegates: Vec<Arc<dyn TimingStrategy>>,
}

impl HybridTiming {
    pub fn new(
        rules: BTreeMap<ContentType, String>,
        delegates: Vec<Arc<dyn TimingStrategy>>,
    ) -> Self {
        Self { rules, delegates }
    }

    pub fn rule(&self, content_type: ContentType) -> &str {
        self.rules
            .get(&content_type)
            .map(String::as_str)
            .unwrap_or(DYNAMIC_TIMING)
    }

    /// Delegate for `content_type`. A rule naming an unknown strategy falls
    /// back to the first delegate.
    fn delegate(&self, content_type: ContentType) -> Option<&Arc<dyn TimingStrategy>> {
        let rule = self.rule(content_type);
        let found = self.delegates.iter().find(|d| d.name() == rule);
        if found.is_none() {
            warn!(
                content_type = %content_type,
                rule,
                "Hybrid rule names no registered strategy, using first delegate"
            );
        }
        found.or_else(|| self.delegates.first())
    }
}

impl TimingStrategy for HybridTiming {
    fn name(&self) -> &'static str {
        HYBRID_TIMING
    }

    fn handles_content_type(&self, content_type: ContentType) -> bool {
        self.delegate(content_type)
            .is_some_and(|d| d.handles_content_type(content_type))
    }

    fn process_transition(&self, event: &TransitionEvent) -> TransitionOutcome {
        match self.delegate(event.content_type()) {
            Some(delegate) => delegate.process_transition(event),
            None => TransitionOutcome::Skipped,
        }
    }

    fn cache_lifetime(&self, context: &mut RenderContext) -> Option<u64> {
        self.delegate(ContentType::Page)
            .and_then(|delegate| delegate.cache_lifetime(context))
    }
}
