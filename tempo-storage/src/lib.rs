//! TEMPO Storage - Content Store Trait and Mock Implementation
//!
//! Defines the storage abstraction the engine consumes, the request-scoped
//! transition cache, and the repository that combines per-collection
//! queries into transition detection.

pub mod invalidator;
pub mod reference;
pub mod repository;
pub mod transition_cache;

pub use invalidator::{CacheInvalidator, RecordingInvalidator};
pub use reference::{MockReferenceIndex, RecordRef, ReferenceIndex};
pub use repository::{ContentStatistics, TemporalContentRepository};
pub use transition_cache::{TransitionCache, TransitionCacheStats, TransitionKey};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tempo_core::{
    StorageError, TempoResult, TemporalContent, TemporalField, Timestamp, TransitionEvent,
};

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for the temporal fields of one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemporalUpdate {
    /// New start time
    pub start_time: Option<Timestamp>,
    /// New end time
    pub end_time: Option<Timestamp>,
}

impl TemporalUpdate {
    pub fn is_empty(&self) -> bool {
        self.start_time.is_none() && self.end_time.is_none()
    }
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Record store holding temporal content.
///
/// Every query excludes deleted records. Variant filtering: a record matches
/// workspace `ws` when it is live (`0`) or belongs to `ws`, and matches
/// language `lang` when either side is `-1` (all languages) or they agree.
pub trait ContentStore: Send + Sync {
    /// Every record of `collection` matching the variant filter.
    fn find_all(
        &self,
        collection: &str,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TemporalContent>>;

    /// Start/end crossings in `(start, end]` for visible-capable records of
    /// `collection`, sorted chronologically.
    fn find_transitions_in_range(
        &self,
        collection: &str,
        start: Timestamp,
        end: Timestamp,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TransitionEvent>>;

    /// Smallest value of `field` strictly greater than `reference_time`
    /// among non-hidden records of `collection`.
    ///
    /// Implementations must answer this with a single aggregate query; it
    /// runs on every cache-lifetime computation.
    fn find_min_transition(
        &self,
        collection: &str,
        field: TemporalField,
        reference_time: Timestamp,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Option<Timestamp>>;

    /// Look up one record. Unknown ids and collections yield `Ok(None)`.
    fn find_by_id(
        &self,
        id: i64,
        collection: &str,
        workspace_id: i64,
    ) -> TempoResult<Option<TemporalContent>>;

    /// Persist new temporal field values for one record.
    fn update_temporal_fields(
        &self,
        collection: &str,
        id: i64,
        update: TemporalUpdate,
    ) -> TempoResult<()>;
}

/// Whether `content` belongs to the requested workspace/language variant.
pub fn matches_variant(content: &TemporalContent, workspace_id: i64, language_id: i64) -> bool {
    let workspace_ok = content.workspace_id == 0 || content.workspace_id == workspace_id;
    let language_ok =
        language_id == -1 || content.language_id == -1 || content.language_id == language_id;
    workspace_ok && language_ok && !content.deleted
}

// ============================================================================
// MOCK STORAGE
// ============================================================================

/// In-memory content store for testing.
#[derive(Debug, Default)]
pub struct MockContentStore {
    collections: RwLock<HashMap<String, BTreeMap<i64, TemporalContent>>>,
    failing: RwLock<HashSet<String>>,
    min_transition_queries: AtomicUsize,
    read_only: RwLock<HashSet<(String, i64)>>,
}

impl MockContentStore {
    /// Create a new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, content: TemporalContent) -> TempoResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        collections
            .entry(content.collection_name.clone())
            .or_default()
            .insert(content.id, content);
        Ok(())
    }

    /// Insert many records.
    pub fn insert_all<I>(&self, contents: I) -> TempoResult<()>
    where
        I: IntoIterator<Item = TemporalContent>,
    {
        for content in contents {
            self.insert(content)?;
        }
        Ok(())
    }

    /// Make every query against `collection` fail.
    pub fn fail_collection(&self, collection: &str) -> TempoResult<()> {
        self.failing
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert(collection.to_string());
        Ok(())
    }

    /// Make updates of one record fail.
    pub fn make_read_only(&self, collection: &str, id: i64) -> TempoResult<()> {
        self.read_only
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .insert((collection.to_string(), id));
        Ok(())
    }

    /// Number of `find_min_transition` calls served so far.
    pub fn min_transition_query_count(&self) -> usize {
        self.min_transition_queries.load(Ordering::Relaxed)
    }

    /// Total number of stored records.
    pub fn record_count(&self) -> usize {
        self.collections
            .read()
            .map(|c| c.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    fn check_available(&self, collection: &str) -> TempoResult<()> {
        let failing = self.failing.read().map_err(|_| StorageError::LockPoisoned)?;
        if failing.contains(collection) {
            return Err(StorageError::QueryFailed {
                collection: collection.to_string(),
                reason: "collection unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn matching(
        &self,
        collection: &str,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TemporalContent>> {
        self.check_available(collection)?;
        let collections = self
            .collections
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|c| matches_variant(c, workspace_id, language_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl ContentStore for MockContentStore {
    fn find_all(
        &self,
        collection: &str,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TemporalContent>> {
        self.matching(collection, workspace_id, language_id)
    }

    fn find_transitions_in_range(
        &self,
        collection: &str,
        start: Timestamp,
        end: Timestamp,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Vec<TransitionEvent>> {
        let in_range = |ts: Timestamp| ts > start && ts <= end;
        let mut events = Vec::new();

        for content in self.matching(collection, workspace_id, language_id)? {
            if content.hidden {
                continue;
            }
            for field in TemporalField::ALL {
                if content.temporal_value(field).is_some_and(in_range) {
                    events.extend(TransitionEvent::for_field(content.clone(), field));
                }
            }
        }

        events.sort_by_key(|e| (e.timestamp(), e.content().id));
        Ok(events)
    }

    fn find_min_transition(
        &self,
        collection: &str,
        field: TemporalField,
        reference_time: Timestamp,
        workspace_id: i64,
        language_id: i64,
    ) -> TempoResult<Option<Timestamp>> {
        self.min_transition_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .matching(collection, workspace_id, language_id)?
            .iter()
            .filter(|c| !c.hidden)
            .filter_map(|c| c.temporal_value(field))
            .filter(|ts| *ts > reference_time)
            .min())
    }

    fn find_by_id(
        &self,
        id: i64,
        collection: &str,
        workspace_id: i64,
    ) -> TempoResult<Option<TemporalContent>> {
        self.check_available(collection)?;
        let collections = self
            .collections
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(&id))
            .filter(|c| !c.deleted && (c.workspace_id == 0 || c.workspace_id == workspace_id))
            .cloned())
    }

    fn update_temporal_fields(
        &self,
        collection: &str,
        id: i64,
        update: TemporalUpdate,
    ) -> TempoResult<()> {
        self.check_available(collection)?;
        let read_only = self
            .read_only
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        if read_only.contains(&(collection.to_string(), id)) {
            return Err(StorageError::UpdateFailed {
                collection: collection.to_string(),
                id,
                reason: "record is read-only".to_string(),
            }
            .into());
        }

        let mut collections = self
            .collections
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(&id))
            .ok_or_else(|| StorageError::UpdateFailed {
                collection: collection.to_string(),
                id,
                reason: "record not found".to_string(),
            })?;

        if let Some(start_time) = update.start_time {
            record.start_time = Some(start_time);
        }
        if let Some(end_time) = update.end_time {
            record.end_time = Some(end_time);
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
