//! Request-scoped memoization of "next transition" lookups.
//!
//! A cache lives for exactly one request or operation. It is owned by the
//! caller's context value and dropped (or cleared) afterwards; it is never
//! shared across requests or threads.

use std::collections::HashMap;
use tempo_core::{TempoResult, Timestamp};

/// Exact lookup key. Reference times are not rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    pub reference_time: Timestamp,
    pub workspace_id: i64,
    pub language_id: i64,
}

impl TransitionKey {
    pub fn new(reference_time: Timestamp, workspace_id: i64, language_id: i64) -> Self {
        Self {
            reference_time,
            workspace_id,
            language_id,
        }
    }
}

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
}

impl TransitionCacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoized next-transition results.
///
/// A stored `None` means "computed, no upcoming transition" and is a hit.
#[derive(Debug, Default)]
pub struct TransitionCache {
    entries: HashMap<TransitionKey, Option<Timestamp>>,
    hits: u64,
    misses: u64,
}

impl TransitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if the key was never computed, `Some(result)` otherwise.
    pub fn get(&self, key: &TransitionKey) -> Option<Option<Timestamp>> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &TransitionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: TransitionKey, value: Option<Timestamp>) {
        self.entries.insert(key, value);
    }

    /// Return the cached value or compute and store it.
    ///
    /// Errors from `compute` are returned and nothing is cached.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        key: TransitionKey,
        compute: F,
    ) -> TempoResult<Option<Timestamp>>
    where
        F: FnOnce() -> TempoResult<Option<Timestamp>>,
    {
        if let Some(cached) = self.get(&key) {
            self.hits += 1;
            return Ok(cached);
        }

        self.misses += 1;
        let value = compute()?;
        self.entries.insert(key, value);
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> TransitionCacheStats {
        TransitionCacheStats {
            hits: self.hits,
            misses: self.misses,
            entry_count: self.entries.len() as u64,
        }
    }
}
