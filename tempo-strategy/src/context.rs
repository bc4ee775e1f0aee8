//! Per-request rendering context.

use tempo_core::TransitionEvent;
use tempo_storage::TransitionCache;

/// State scoped to one page render or one processed event.
///
/// Owns the request's [`TransitionCache`]; dropping the context discards
/// every memoized lookup.
#[derive(Debug, Default)]
pub struct RenderContext {
    workspace_id: i64,
    language_id: i64,
    transitions: TransitionCache,
}

impl RenderContext {
    pub fn new(workspace_id: i64, language_id: i64) -> Self {
        Self {
            workspace_id,
            language_id,
            transitions: TransitionCache::new(),
        }
    }

    /// Live workspace, default language.
    pub fn live() -> Self {
        Self::new(0, 0)
    }

    /// Context matching the variant an event was detected in.
    pub fn for_event(event: &TransitionEvent) -> Self {
        Self::new(event.workspace_id(), event.language_id())
    }

    pub fn workspace_id(&self) -> i64 {
        self.workspace_id
    }

    pub fn language_id(&self) -> i64 {
        self.language_id
    }

    pub fn transition_cache(&self) -> &TransitionCache {
        &self.transitions
    }

    pub fn transition_cache_mut(&mut self) -> &mut TransitionCache {
        &mut self.transitions
    }

    /// Forget memoized lookups before reusing the context for a new request.
    pub fn reset(&mut self) {
        self.transitions.clear();
    }
}
