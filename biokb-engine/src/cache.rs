//! Query result caching.
//!
//! Entries are keyed by snapshot generation as well as the normalized query,
//! so a result computed against an old snapshot can never be served for a
//! new one even if it lands after [`QueryCache::invalidate_all`].

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::resolver::Resolution;

/// Capacity used when zero is requested.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

type CacheKey = (u64, String);

/// Bounded cache of resolved queries. Reads do not refresh an entry, so the
/// least recently populated entry is evicted first.
pub struct QueryCache {
    resolutions: Mutex<LruCache<CacheKey, Arc<Resolution>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Create a new cache with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            resolutions: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Normalized form of a query used as the cache key.
    pub fn normalize(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    /// Get a cached resolution.
    pub fn get(&self, generation: u64, query: &str) -> Option<Arc<Resolution>> {
        let key = (generation, Self::normalize(query));
        let found = self.resolutions.lock().peek(&key).cloned();
        match &found {
            Some(_) => {
                trace!("Query cache hit: {:?}", key.1);
                self.hits.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        found
    }

    /// Store a resolution.
    pub fn put(&self, generation: u64, query: &str, resolution: Arc<Resolution>) {
        self.resolutions
            .lock()
            .put((generation, Self::normalize(query)), resolution);
    }

    /// Drop every entry. Called whenever a new snapshot is installed.
    pub fn invalidate_all(&self) {
        self.resolutions.lock().clear();
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let guard = self.resolutions.lock();
        CacheStats {
            entries: guard.len(),
            capacity: guard.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ConceptSet, ResolutionPath};

    fn resolution(marker: usize) -> Arc<Resolution> {
        Arc::new(Resolution {
            concepts: ConceptSet::default(),
            publication_ids: Vec::new(),
            path: ResolutionPath::Sufficient,
            candidates_before_broadening: marker,
        })
    }

    #[test]
    fn test_cache_new_with_zero_capacity_uses_default() {
        let cache = QueryCache::new(0);
        assert_eq!(cache.stats().capacity, DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            QueryCache::normalize("  Effects of   MICROGRAVITY\ton mice "),
            "effects of microgravity on mice"
        );
    }

    #[test]
    fn test_set_and_get() {
        let cache = QueryCache::new(10);
        cache.put(1, "bone loss", resolution(3));
        let found = cache.get(1, "Bone  Loss").unwrap();
        assert_eq!(found.candidates_before_broadening, 3);
    }

    #[test]
    fn test_miss_on_other_generation() {
        let cache = QueryCache::new(10);
        cache.put(1, "bone loss", resolution(3));
        assert!(cache.get(2, "bone loss").is_none());
    }

    #[test]
    fn test_invalidate_all() {
        let cache = QueryCache::new(10);
        cache.put(1, "a", resolution(1));
        cache.put(1, "b", resolution(2));
        assert_eq!(cache.stats().entries, 2);

        cache.invalidate_all();

        assert_eq!(cache.stats().entries, 0);
        assert!(cache.get(1, "a").is_none());
    }

    #[test]
    fn test_evicts_least_recently_populated() {
        let cache = QueryCache::new(2);
        cache.put(0, "first", resolution(1));
        cache.put(0, "second", resolution(2));
        // Reading does not refresh the entry
        assert!(cache.get(0, "first").is_some());
        cache.put(0, "third", resolution(3));

        assert!(cache.get(0, "first").is_none());
        assert!(cache.get(0, "second").is_some());
        assert!(cache.get(0, "third").is_some());
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = QueryCache::new(4);
        cache.put(0, "a", resolution(1));
        cache.get(0, "a");
        cache.get(0, "a");
        cache.get(0, "b");
        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let cache = Arc::new(QueryCache::new(1000));
        let mut handles = vec![];

        for i in 0..8u64 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..50usize {
                    cache.put(i, &format!("query {j}"), resolution(j));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.stats().entries, 400);
    }
}
