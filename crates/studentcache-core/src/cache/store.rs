use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::DataBundle;

use super::clock::{Clock, SystemClock};

/// Consider a bundle stale after 5 minutes.
pub const DEFAULT_FRESHNESS_MINUTES: i64 = 5;

/// Identifies one cached bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub student_id: i64,
    pub year: i32,
}

impl CacheKey {
    pub fn new(student_id: i64, year: i32) -> Self {
        Self { student_id, year }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.student_id, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub bundle: DataBundle,
    pub fetched_at: DateTime<Utc>,
}

/// Human label for how long ago `fetched_at` was, rounded to the nearest
/// hour or day once past the first hour.
pub fn age_label(fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const HOUR: i64 = 60;
    const DAY: i64 = 24 * HOUR;

    match (now - fetched_at).num_minutes() {
        // Negative ages come from clock skew
        m if m < 1 => "just now".to_string(),
        m if m < HOUR => format!("{m}m ago"),
        m if m < DAY => format!("{}h ago", (m + HOUR / 2) / HOUR),
        m => format!("{}d ago", (m + DAY / 2) / DAY),
    }
}

/// Session-scoped cache of academic bundles.
///
/// Share it behind an `Arc` between every controller that should see the
/// same data. Entries are replaced wholesale and never mutated in place.
///
/// Every invalidation bumps a generation counter. A writer that read the
/// generation before a slow fetch stores its result with `set_if_current`,
/// which refuses the write if an invalidation happened in between.
pub struct CacheStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    generation: AtomicU64,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    capacity: Option<usize>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            clock,
            freshness: Duration::minutes(DEFAULT_FRESHNESS_MINUTES),
            capacity: None,
        }
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    /// Bound the number of keys held. When full, storing a new key evicts
    /// the entry with the oldest fetch time.
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.capacity = Some(max_entries.max(1));
        self
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        // The map is always left consistent, so a poisoned lock is still usable
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries().get(key).cloned()
    }

    /// The entry for `key` only if it is still fresh
    pub fn get_fresh(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get(key).filter(|entry| self.is_fresh(entry))
    }

    /// Current invalidation generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store `bundle` for `key`, stamped with the current time.
    pub fn set(&self, key: CacheKey, bundle: DataBundle) -> CacheEntry {
        let mut entries = self.entries();
        self.insert(&mut entries, key, bundle)
    }

    /// Store `bundle` only if nothing was invalidated since `generation` was
    /// read. Returns `None` when the write was refused.
    pub fn set_if_current(
        &self,
        key: CacheKey,
        bundle: DataBundle,
        generation: u64,
    ) -> Option<CacheEntry> {
        let mut entries = self.entries();
        // Bumped under the same lock, so no invalidation can slip in between
        if self.generation() != generation {
            debug!(key = %key, generation, "Cache invalidated during fetch, dropping result");
            return None;
        }
        Some(self.insert(&mut entries, key, bundle))
    }

    fn insert(
        &self,
        entries: &mut HashMap<CacheKey, CacheEntry>,
        key: CacheKey,
        bundle: DataBundle,
    ) -> CacheEntry {
        let entry = CacheEntry {
            bundle,
            fetched_at: self.clock.now(),
        };

        if let Some(capacity) = self.capacity {
            if !entries.contains_key(&key) && entries.len() >= capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.fetched_at)
                    .map(|(k, _)| *k);
                if let Some(oldest) = oldest {
                    debug!(evicted = %oldest, "Cache full, evicting oldest entry");
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(key, entry.clone());
        entry
    }

    pub fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.clock.now() - entry.fetched_at < self.freshness
    }

    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.entries();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if entries.remove(key).is_some() {
            debug!(key = %key, "Cache entry invalidated");
        }
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries();
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!(count = entries.len(), "Invalidating all cache entries");
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
