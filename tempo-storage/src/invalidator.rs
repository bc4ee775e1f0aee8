//! Cache invalidation client trait and an in-memory recorder.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tempo_core::{StorageError, TempoResult};

/// External page cache that can drop entries by tag.
///
/// Flushing is idempotent and commutative: flushing a tag twice, or a superset
/// of the needed tags, is always safe.
pub trait CacheInvalidator: Send + Sync {
    fn flush_by_tags(&self, tags: &BTreeSet<String>) -> TempoResult<()>;
}

/// Invalidator that records every flush instead of talking to a cache.
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    flushes: Mutex<Vec<BTreeSet<String>>>,
    failing: AtomicBool,
}

impl RecordingInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder whose flushes all fail.
    pub fn failing() -> Self {
        let invalidator = Self::default();
        invalidator.set_failing(true);
        invalidator
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every successful flush, in call order.
    pub fn flushes(&self) -> Vec<BTreeSet<String>> {
        self.flushes.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Union of all flushed tags.
    pub fn flushed_tags(&self) -> BTreeSet<String> {
        self.flushes().into_iter().flatten().collect()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.lock().map(|f| f.len()).unwrap_or(0)
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn flush_by_tags(&self, tags: &BTreeSet<String>) -> TempoResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::FlushFailed {
                reason: "cache backend unavailable".to_string(),
            }
            .into());
        }

        self.flushes
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .push(tags.clone());
        Ok(())
    }
}
