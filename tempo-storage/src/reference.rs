//! Reference index: which records point at which others.
//!
//! The index is derived data maintained by the host system. Lookups that the
//! index cannot answer return [`ReferenceError::IndexUnavailable`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tempo_core::{ReferenceError, StorageError, TempoResult};

/// Pointer to a record in some collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordRef {
    pub collection: String,
    pub id: i64,
}

impl RecordRef {
    pub fn new(collection: impl Into<String>, id: i64) -> Self {
        Self {
            collection: collection.into(),
            id,
        }
    }
}

/// Read access to the reference graph.
pub trait ReferenceIndex: Send + Sync {
    /// Records that reference `(collection, id)` in workspace `workspace_id`.
    fn referrers_of(
        &self,
        collection: &str,
        id: i64,
        workspace_id: i64,
    ) -> TempoResult<Vec<RecordRef>>;

    /// Pages configured to mount one of `pages`.
    fn mount_points_for(&self, pages: &BTreeSet<i64>, workspace_id: i64) -> TempoResult<Vec<i64>>;

    /// Pages configured as shortcuts to one of `pages`.
    fn shortcuts_to(&self, pages: &BTreeSet<i64>, workspace_id: i64) -> TempoResult<Vec<i64>>;
}

#[derive(Debug, Default)]
struct IndexData {
    /// target -> referrers
    references: BTreeMap<RecordRef, BTreeSet<RecordRef>>,
    /// mounting page -> mounted page
    mount_points: BTreeMap<i64, i64>,
    /// shortcut page -> target page
    shortcuts: BTreeMap<i64, i64>,
}

/// In-memory reference index for testing.
///
/// Workspaces are not modelled; every entry is visible in every workspace.
#[derive(Debug, Default)]
pub struct MockReferenceIndex {
    data: RwLock<IndexData>,
    failing: AtomicBool,
}

impl MockReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `referrer` references `target`.
    pub fn add_reference(&self, referrer: RecordRef, target: RecordRef) -> TempoResult<()> {
        self.data
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .references
            .entry(target)
            .or_default()
            .insert(referrer);
        Ok(())
    }

    /// Configure `page` to mount the content of `mounted`.
    pub fn add_mount_point(&self, page: i64, mounted: i64) -> TempoResult<()> {
        self.data
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .mount_points
            .insert(page, mounted);
        Ok(())
    }

    /// Configure `page` as a shortcut to `target`.
    pub fn add_shortcut(&self, page: i64, target: i64) -> TempoResult<()> {
        self.data
            .write()
            .map_err(|_| StorageError::LockPoisoned)?
            .shortcuts
            .insert(page, target);
        Ok(())
    }

    /// Make every lookup fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> TempoResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ReferenceError::IndexUnavailable {
                reason: "reference index offline".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn pages_pointing_into(links: &BTreeMap<i64, i64>, pages: &BTreeSet<i64>) -> Vec<i64> {
    links
        .iter()
        .filter(|(_, target)| pages.contains(target))
        .map(|(page, _)| *page)
        .collect()
}

impl ReferenceIndex for MockReferenceIndex {
    fn referrers_of(
        &self,
        collection: &str,
        id: i64,
        _workspace_id: i64,
    ) -> TempoResult<Vec<RecordRef>> {
        self.check_available()?;
        let data = self.data.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(data
            .references
            .get(&RecordRef::new(collection, id))
            .map(|referrers| referrers.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn mount_points_for(&self, pages: &BTreeSet<i64>, _workspace_id: i64) -> TempoResult<Vec<i64>> {
        self.check_available()?;
        let data = self.data.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(pages_pointing_into(&data.mount_points, pages))
    }

    fn shortcuts_to(&self, pages: &BTreeSet<i64>, _workspace_id: i64) -> TempoResult<Vec<i64>> {
        self.check_available()?;
        let data = self.data.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(pages_pointing_into(&data.shortcuts, pages))
    }
}
