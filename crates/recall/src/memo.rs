// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::telemetry::{self, CacheActivity};
use crate::{CacheHolder, CacheStats};

/// The default holder of [`cached`](crate::cached) functions.
///
/// A named, thread-safe map that counts hits and misses. [`MemoCache::new`] is a `const fn`, so
/// the cache can be the initializer of a `static`; the map itself is allocated on first insert.
///
/// The lock is held only for the duration of a lookup or an insert, never while the memoized
/// function runs, so recursive functions do not deadlock.
///
/// With the `logs` feature, every lookup and insert emits a `cache.event` through `tracing`.
///
/// # Examples
///
/// ```
/// use recall::{CacheHolder, MemoCache};
///
/// static SQUARES: MemoCache<u64, u64> = MemoCache::new("squares");
///
/// assert_eq!(SQUARES.get(&3), None);
/// SQUARES.put(3, 9);
/// assert_eq!(SQUARES.get(&3), Some(9));
///
/// let stats = SQUARES.stats();
/// assert_eq!((stats.hits, stats.misses), (1, 1));
/// ```
pub struct MemoCache<K, V> {
    name: &'static str,
    entries: Mutex<Option<HashMap<K, V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> MemoCache<K, V> {
    /// Creates an empty cache reported as `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: parking_lot::const_mutex(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The name used in log events.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Number of stored results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().as_ref().map_or(0, HashMap::len)
    }

    /// Returns `true` if no result is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hits and misses counted since creation.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drops every stored result. The counters are kept.
    pub fn clear(&self) {
        *self.entries.lock() = None;
    }
}

impl<K, V> CacheHolder<K, V> for MemoCache<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    fn get(&self, key: &K) -> Option<V> {
        let value = self.entries.lock().as_ref().and_then(|entries| entries.get(key).cloned());

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            telemetry::emit(self.name, CacheActivity::Hit);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            telemetry::emit(self.name, CacheActivity::Miss);
        }

        value
    }

    fn put(&self, key: K, value: V) -> Option<V> {
        let previous = self.entries.lock().get_or_insert_with(HashMap::new).insert(key, value);
        telemetry::emit(self.name, CacheActivity::Inserted);
        previous
    }
}

impl<K, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::new("memo")
    }
}

impl<K, V> fmt::Debug for MemoCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoCache")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_empty() {
        let cache: MemoCache<(u32,), String> = MemoCache::new("empty");

        assert_eq!(cache.name(), "empty");
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn counts_hits_and_misses() {
        let cache = MemoCache::new("counting");

        assert_eq!(cache.get(&(1, 2)), None);
        assert_eq!(cache.put((1, 2), 2), None);
        assert_eq!(cache.get(&(1, 2)), Some(2));
        assert_eq!(cache.get(&(2, 1)), None);

        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn put_replaces_and_returns_previous() {
        let cache = MemoCache::new("replace");

        assert_eq!(cache.put("k".to_owned(), 1), None);
        assert_eq!(cache.put("k".to_owned(), 2), Some(1));
        assert_eq!(cache.get(&"k".to_owned()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let cache = MemoCache::new("independent");

        cache.put((1,), "one".to_owned());
        cache.put((2,), "two".to_owned());

        assert_eq!(cache.get(&(1,)).as_deref(), Some("one"));
        assert_eq!(cache.get(&(2,)).as_deref(), Some("two"));
    }

    #[test]
    fn clear_keeps_counters() {
        let cache = MemoCache::new("clear");
        cache.put((), 1_u8);
        _ = cache.get(&());

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.get(&()), None);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn usable_as_static() {
        static CACHE: MemoCache<u64, u64> = MemoCache::new("static");

        CACHE.put(7, 49);
        assert_eq!(CACHE.get(&7), Some(49));
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(MemoCache::<u32, u32>::new("threads"));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache.put(i, i * 10);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn default_and_debug() {
        let cache: MemoCache<u8, u8> = MemoCache::default();
        let debug = format!("{cache:?}");

        assert_eq!(cache.name(), "memo");
        assert!(debug.contains("MemoCache"));
        assert!(debug.contains("\"memo\""));
    }

    #[cfg(feature = "logs")]
    #[test]
    fn lookups_and_inserts_are_logged() {
        use crate::testing::LogCapture;

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let cache = MemoCache::new("logged");
        _ = cache.get(&1_u8);
        cache.put(1_u8, 1_u8);
        _ = cache.get(&1_u8);

        capture.assert_contains("cache.name=\"logged\"");
        capture.assert_contains("cache.miss");
        capture.assert_contains("cache.inserted");
        capture.assert_contains("cache.hit");
    }
}
