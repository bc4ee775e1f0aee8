//! Transition detection across every monitored collection.

use crate::{ContentStore, TransitionCache, TransitionKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tempo_core::{
    ContentType, MonitorRegistry, TempoResult, TemporalContent, TemporalField, Timestamp,
    TransitionEvent,
};
use tracing::debug;

/// Aggregate counts over the bulk scan, for dashboards and reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentStatistics {
    pub total: usize,
    pub pages: usize,
    pub content_elements: usize,
    pub by_collection: BTreeMap<String, usize>,
    /// Visible at the reference time.
    pub active: usize,
    /// Start time still in the future.
    pub pending: usize,
    /// End time already reached.
    pub expired: usize,
    pub hidden: usize,
    pub with_start: usize,
    pub with_end: usize,
    pub next_transition: Option<Timestamp>,
}

/// Combines per-collection store queries over the registry.
#[derive(Clone)]
pub struct TemporalContentRepository {
    store: Arc<dyn ContentStore>,
    registry: Arc<MonitorRegistry>,
}

impl TemporalContentRepository {
    pub fn new(store: Arc<dyn ContentStore>, registry: Arc<MonitorRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn registry(&self) -> &MonitorRegistry {
        &self.registry
    }

    /// Every matching record of every registered collection.
    pub fn find_all(
        &self,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TemporalContent>> {
        let mut all = Vec::new();
        for collection in self.registry.collections() {
            all.extend(self.store.find_all(collection, workspace_id, language_id)?);
        }
        Ok(all)
    }

    /// Transitions in `(start, end]` across all collections, chronologically.
    pub fn find_transitions_in_range(
        &self,
        start: Timestamp,
        end: Timestamp,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TransitionEvent>> {
        let mut events = Vec::new();
        for collection in self.registry.collections() {
            events.extend(self.store.find_transitions_in_range(
                collection,
                start,
                end,
                workspace_id,
                language_id,
            )?);
        }
        events.sort_by(|a, b| {
            (a.timestamp(), &a.content().collection_name, a.content().id).cmp(&(
                b.timestamp(),
                &b.content().collection_name,
                b.content().id,
            ))
        });

        debug!(
            start,
            end,
            workspace_id,
            language_id,
            count = events.len(),
            "Found transitions in range"
        );
        Ok(events)
    }

    /// Earliest start/end strictly after `reference_time`, memoized in `cache`.
    pub fn next_transition(
        &self,
        reference_time: Timestamp,
        workspace_id: i64,
        language_id: i64,
        cache: &mut TransitionCache,
    ) -> TempoResult<Option<Timestamp>> {
        let key = TransitionKey::new(reference_time, workspace_id, language_id);
        cache.get_or_try_insert_with(key, || {
            self.next_transition_uncached(reference_time, workspace_id, language_id)
        })
    }

    /// One aggregate query per (collection, field); the overall minimum wins.
    pub fn next_transition_uncached(
        &self,
        reference_time: Timestamp,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Option<Timestamp>> {
        let mut next: Option<Timestamp> = None;
        for collection in self.registry.collections() {
            for field in TemporalField::ALL {
                let candidate = self.store.find_min_transition(
                    collection,
                    field,
                    reference_time,
                    workspace_id,
                    language_id,
                )?;
                next = match (next, candidate) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            }
        }

        debug!(
            reference_time,
            workspace_id,
            language_id,
            next_transition = ?next,
            "Computed next transition"
        );
        Ok(next)
    }

    /// Transitions in `(now, now + horizon]`.
    pub fn upcoming_transitions(
        &self,
        now: Timestamp,
        horizon: i64,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TransitionEvent>> {
        self.find_transitions_in_range(now, now.saturating_add(horizon), workspace_id, language_id)
    }

    /// Look up one record. Unregistered collections yield `Ok(None)`.
    pub fn find_by_id(
        &self,
        id: i64,
        collection: &str,
        workspace_id: i64,
    ) -> TempoResult<Option<TemporalContent>> {
        if !self.registry.is_registered(collection) {
            return Ok(None);
        }
        self.store.find_by_id(id, collection, workspace_id)
    }

    pub fn statistics(
        &self,
        now: Timestamp,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<ContentStatistics> {
        let mut stats = ContentStatistics::default();

        for content in self.find_all(workspace_id, language_id)? {
            stats.total += 1;
            match content.content_type() {
                ContentType::Page => stats.pages += 1,
                ContentType::Content => stats.content_elements += 1,
            }
            *stats
                .by_collection
                .entry(content.collection_name.clone())
                .or_default() += 1;

            if content.is_visible(now) {
                stats.active += 1;
            }
            if content.start_time.is_some_and(|start| start > now) {
                stats.pending += 1;
            }
            if content.end_time.is_some_and(|end| end <= now) {
                stats.expired += 1;
            }
            if content.hidden {
                stats.hidden += 1;
            }
            if content.start_time.is_some() {
                stats.with_start += 1;
            }
            if content.end_time.is_some() {
                stats.with_end += 1;
            }
        }

        stats.next_transition = self.next_transition_uncached(now, workspace_id, language_id)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockContentStore;
    use tempo_core::{TransitionType, CONTENT_COLLECTION, PAGES_COLLECTION};

    const T: Timestamp = 1_700_000_000;

    fn repository_with(
        contents: Vec<TemporalContent>,
    ) -> (Arc<MockContentStore>, TemporalContentRepository) {
        let store = Arc::new(MockContentStore::new());
        store.insert_all(contents).unwrap();
        let repository =
            TemporalContentRepository::new(store.clone(), Arc::new(MonitorRegistry::new()));
        (store, repository)
    }

    #[test]
    fn test_next_transition_across_collections() {
        let (_, repository) = repository_with(vec![
            TemporalContent::page(1, 0).with_window(Some(T + 500), None),
            TemporalContent::content_element(10, 1).with_window(None, Some(T + 200)),
        ]);

        assert_eq!(repository.next_transition_uncached(T, 0, 0).unwrap(), Some(T + 200));
        assert_eq!(
            repository.next_transition_uncached(T + 200, 0, 0).unwrap(),
            Some(T + 500)
        );
        assert_eq!(repository.next_transition_uncached(T + 500, 0, 0).unwrap(), None);
    }

    #[test]
    fn test_next_transition_is_memoized() {
        let (store, repository) = repository_with(vec![
            TemporalContent::page(1, 0).with_window(Some(T + 500), None),
        ]);
        let mut cache = TransitionCache::new();

        let first = repository.next_transition(T, 0, 0, &mut cache).unwrap();
        let queries = store.min_transition_query_count();
        let second = repository.next_transition(T, 0, 0, &mut cache).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.min_transition_query_count(), queries);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_memoized_none() {
        let (store, repository) = repository_with(vec![]);
        let mut cache = TransitionCache::new();

        assert_eq!(repository.next_transition(T, 0, 0, &mut cache).unwrap(), None);
        let queries = store.min_transition_query_count();
        assert_eq!(repository.next_transition(T, 0, 0, &mut cache).unwrap(), None);
        assert_eq!(store.min_transition_query_count(), queries);
    }

    #[test]
    fn test_store_failure_is_not_cached() {
        let (store, repository) = repository_with(vec![]);
        store.fail_collection(PAGES_COLLECTION).unwrap();
        let mut cache = TransitionCache::new();

        assert!(repository.next_transition(T, 0, 0, &mut cache).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_find_transitions_in_range_is_sorted() {
        let (_, repository) = repository_with(vec![
            TemporalContent::page(1, 0).with_window(Some(T + 30), Some(T + 90)),
            TemporalContent::content_element(10, 1).with_window(Some(T + 10), Some(T + 60)),
        ]);

        let events = repository.find_transitions_in_range(T, T + 90, 0, 0).unwrap();
        let summary: Vec<(Timestamp, TransitionType)> = events
            .iter()
            .map(|e| (e.timestamp(), e.transition_type()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (T + 10, TransitionType::Start),
                (T + 30, TransitionType::Start),
                (T + 60, TransitionType::End),
                (T + 90, TransitionType::End),
            ]
        );
    }

    #[test]
    fn test_upcoming_transitions_respects_horizon() {
        let (_, repository) = repository_with(vec![
            TemporalContent::page(1, 0).with_window(Some(T + 30), Some(T + 3_000)),
        ]);

        let events = repository.upcoming_transitions(T, 60, 0, 0).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp(), T + 30);
    }

    #[test]
    fn test_find_by_id_unregistered_collection() {
        let (store, repository) = repository_with(vec![TemporalContent::new(1, "news", 0)]);
        assert_eq!(store.record_count(), 1);
        assert!(repository.find_by_id(1, "news", 0).unwrap().is_none());
    }

    #[test]
    fn test_statistics() {
        let (_, repository) = repository_with(vec![
            TemporalContent::page(1, 0).with_window(Some(T - 10), Some(T + 100)),
            TemporalContent::page(2, 0).with_window(Some(T + 50), None),
            TemporalContent::page(3, 0).with_window(None, Some(T - 5)),
            TemporalContent::content_element(10, 1).with_hidden(true),
        ]);

        let stats = repository.statistics(T, 0, 0).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pages, 3);
        assert_eq!(stats.content_elements, 1);
        assert_eq!(stats.by_collection.get(CONTENT_COLLECTION), Some(&1));
        assert_eq!(stats.active, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.hidden, 1);
        assert_eq!(stats.with_start, 2);
        assert_eq!(stats.with_end, 2);
        assert_eq!(stats.next_transition, Some(T + 50));

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["pending"], 1);
        assert_eq!(json["by_collection"]["pages"], 3);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
