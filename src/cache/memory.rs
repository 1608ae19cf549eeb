//! In-process bundle cache with priority-weighted LRU/LFU eviction.
//!
//! Bounded by entry count and by cumulative byte size. Misses fall through to the
//! persistent tier; bundles recovered that way come back at `Priority::Low`, which
//! keeps them ranked below entries that were put in memory deliberately.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::Instant;

use super::persistent::PersistentStore;
use crate::bundle::TranslationBundle;

/// Default maximum number of cached locales.
pub const DEFAULT_MAX_ENTRIES: usize = 10;
/// Default maximum cumulative size (5 MiB).
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Caller-assigned importance of a cached bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Recovered from storage or speculative.
    Low,
    /// Preloaded locales.
    Normal,
    /// The active locale.
    High,
    /// Never meant to be evicted before anything else.
    Critical,
}

impl Priority {
    /// Weight used in the eviction score.
    #[must_use]
    pub const fn weight(self) -> f64 {
        match self {
            Self::Low => 1.0,
            Self::Normal => 2.0,
            Self::High => 5.0,
            Self::Critical => 10.0,
        }
    }
}

/// One cached bundle and its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached bundle.
    pub bundle: Arc<TranslationBundle>,
    /// Importance.
    pub priority: Priority,
    /// Hits plus the initial insert.
    pub access_count: u64,
    /// Last insert or hit.
    pub last_access: Instant,
    /// Footprint charged against the byte budget.
    pub size_bytes: usize,
}

impl CacheEntry {
    /// What: Eviction score; lower means evicted sooner.
    ///
    /// Details:
    /// - `priority * access_count * 1000 / (age_ms + 1)`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, now: Instant) -> f64 {
        let age_ms = now.saturating_duration_since(self.last_access).as_millis() as f64;
        self.priority.weight() * self.access_count as f64 * 1000.0 / (age_ms + 1.0)
    }
}

/// Counters exposed by `MemoryCache::stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Cached locales.
    pub entries: usize,
    /// Bytes charged.
    pub total_bytes: usize,
    /// Entry limit.
    pub max_entries: usize,
    /// Byte limit.
    pub max_bytes: usize,
    /// Memory hits.
    pub hits: u64,
    /// Misses in both tiers.
    pub misses: u64,
    /// Memory misses answered by the persistent tier.
    pub storage_hits: u64,
    /// Entries evicted for space.
    pub evictions: u64,
}

/// Mutable cache state, only touched under the lock.
#[derive(Debug, Default)]
struct CacheState {
    /// Locale -> entry.
    entries: HashMap<String, CacheEntry>,
    /// Sum of `size_bytes`.
    total_bytes: usize,
    /// Memory hits.
    hits: u64,
    /// Misses in both tiers.
    misses: u64,
    /// Memory misses answered by storage.
    storage_hits: u64,
    /// Evictions.
    evictions: u64,
}

impl CacheState {
    /// Count a memory hit for `locale` and bump its recency.
    fn hit(&mut self, locale: &str) -> Option<Arc<TranslationBundle>> {
        let entry = self.entries.get_mut(locale)?;
        entry.access_count += 1;
        entry.last_access = Instant::now();
        let bundle = Arc::clone(&entry.bundle);
        self.hits += 1;
        Some(bundle)
    }

    /// Locale with the lowest eviction score; ties go to the older access.
    fn eviction_candidate(&self, now: Instant) -> Option<String> {
        self.entries
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.score(now)
                    .total_cmp(&b.score(now))
                    .then_with(|| a.last_access.cmp(&b.last_access))
            })
            .map(|(locale, _)| locale.clone())
    }

    /// Remove the lowest-scoring entry, returning whether anything was evicted.
    fn evict_one(&mut self, now: Instant) -> bool {
        let Some(locale) = self.eviction_candidate(now) else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&locale) {
            self.total_bytes -= entry.size_bytes;
            self.evictions += 1;
            tracing::debug!(
                locale = %locale,
                priority = ?entry.priority,
                access_count = entry.access_count,
                size_bytes = entry.size_bytes,
                "evicted bundle from memory cache"
            );
        }
        true
    }
}

/// Bounded in-memory tier in front of an optional `PersistentStore`.
#[derive(Debug)]
pub struct MemoryCache {
    /// Cache state.
    state: Mutex<CacheState>,
    /// Fall-through tier for misses.
    store: Option<PersistentStore>,
    /// Entry limit.
    max_entries: usize,
    /// Byte limit.
    max_bytes: usize,
}

impl MemoryCache {
    /// What: Create a cache.
    ///
    /// Inputs:
    /// - `max_entries`: Entry limit (at least 1)
    /// - `max_bytes`: Cumulative byte limit
    /// - `store`: Persistent tier consulted on memory misses
    #[must_use]
    pub fn new(max_entries: usize, max_bytes: usize, store: Option<PersistentStore>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            store,
            max_entries: max_entries.max(1),
            max_bytes,
        }
    }

    /// Lock the state, recovering from a poisoned mutex.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Persistent tier, if any.
    #[must_use]
    pub const fn store(&self) -> Option<&PersistentStore> {
        self.store.as_ref()
    }

    /// What: Look up a locale.
    ///
    /// Inputs:
    /// - `locale`: Locale code
    ///
    /// Output:
    /// - The cached bundle, from memory or recovered from the persistent tier
    ///
    /// Details:
    /// - A memory hit bumps the access count and recency.
    /// - A memory miss reads the persistent tier and re-populates memory at `Priority::Low`.
    /// - The storage read runs without the lock; if another task cached the locale
    ///   meanwhile, its entry wins and the recovered copy is dropped.
    #[must_use]
    pub fn get(&self, locale: &str) -> Option<Arc<TranslationBundle>> {
        let cached = self.lock().hit(locale);
        if cached.is_some() {
            return cached;
        }

        let Some(recovered) = self.store.as_ref().and_then(|store| store.load(locale)) else {
            self.lock().misses += 1;
            return None;
        };

        let mut state = self.lock();
        if let Some(current) = state.hit(locale) {
            tracing::debug!(locale, "locale cached while reading storage, keeping memory copy");
            return Some(current);
        }
        tracing::debug!(locale, entries = recovered.len(), "memory miss served by storage");
        let bundle = Arc::new(recovered);
        self.insert_locked(&mut state, locale, Arc::clone(&bundle), Priority::Low);
        state.storage_hits += 1;
        drop(state);
        Some(bundle)
    }

    /// Memory-only lookup that leaves access statistics untouched.
    #[must_use]
    pub fn peek(&self, locale: &str) -> Option<Arc<TranslationBundle>> {
        self.lock()
            .entries
            .get(locale)
            .map(|entry| Arc::clone(&entry.bundle))
    }

    /// What: Insert or replace a bundle.
    ///
    /// Inputs:
    /// - `locale`: Locale code
    /// - `bundle`: Bundle to cache
    /// - `priority`: Importance used in eviction scoring
    ///
    /// Details:
    /// - Replacing keeps the previous access count.
    /// - Evicts by count first, then by size, before inserting.
    /// - A bundle larger than the whole byte budget is not cached.
    pub fn set(&self, locale: &str, bundle: Arc<TranslationBundle>, priority: Priority) {
        let mut state = self.lock();
        self.insert_locked(&mut state, locale, bundle, priority);
        drop(state);
    }

    /// Insert or replace `locale` while the caller holds the lock.
    fn insert_locked(
        &self,
        state: &mut CacheState,
        locale: &str,
        bundle: Arc<TranslationBundle>,
        priority: Priority,
    ) {
        let size_bytes = bundle.size_bytes();
        let previous = state.entries.remove(locale);
        let access_count = previous.as_ref().map_or(1, |old| old.access_count.max(1));
        if let Some(old) = previous {
            state.total_bytes -= old.size_bytes;
        }

        if size_bytes > self.max_bytes {
            tracing::warn!(
                locale,
                size_bytes,
                max_bytes = self.max_bytes,
                "bundle exceeds memory budget, not caching"
            );
            return;
        }

        self.ensure_space(state, size_bytes);
        state.total_bytes += size_bytes;
        state.entries.insert(
            locale.to_string(),
            CacheEntry {
                bundle,
                priority,
                access_count,
                last_access: Instant::now(),
                size_bytes,
            },
        );
    }

    /// What: Make room for an entry of `required_size` bytes.
    ///
    /// Details:
    /// - Count pass: evict while `len >= max_entries`.
    /// - Size pass: evict while the projected total exceeds `max_bytes`.
    /// - Runs entirely under the lock so no caller sees a half-evicted cache.
    fn ensure_space(&self, state: &mut CacheState, required_size: usize) {
        let now = Instant::now();
        while state.entries.len() >= self.max_entries {
            if !state.evict_one(now) {
                break;
            }
        }
        while state.total_bytes + required_size > self.max_bytes {
            if !state.evict_one(now) {
                break;
            }
        }
    }

    /// Drop the memory copy of `locale`; the persisted copy stays.
    pub fn remove(&self, locale: &str) -> Option<Arc<TranslationBundle>> {
        let mut state = self.lock();
        let entry = state.entries.remove(locale)?;
        state.total_bytes -= entry.size_bytes;
        drop(state);
        Some(entry.bundle)
    }

    /// Empty the memory tier.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.total_bytes = 0;
    }

    /// Number of cached locales.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True when nothing is cached in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the cache counters.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        let state = self.lock();
        MemoryStats {
            entries: state.entries.len(),
            total_bytes: state.total_bytes,
            max_entries: self.max_entries,
            max_bytes: self.max_bytes,
            hits: state.hits,
            misses: state.misses,
            storage_hits: state.storage_hits,
            evictions: state.evictions,
        }
    }

    /// Priority currently recorded for `locale`.
    #[must_use]
    pub fn priority_of(&self, locale: &str) -> Option<Priority> {
        self.lock().entries.get(locale).map(|entry| entry.priority)
    }
}
