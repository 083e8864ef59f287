//! Content Cache
//!
//! Typed TTL cache over any `CacheStore`. Expiry is decided at read time
//! against the configured clock, so a stale value is never returned even
//! if the backing store has not evicted it yet.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha1::{Digest, Sha1};
use tracing::{debug, trace, warn};

use super::clock::{Clock, SystemClock};
use super::errors::StorageError;
use super::flight::KeyedLocks;
use super::store::{CacheStore, StoredEntry};

/// Stable cache key for `id` within an operation namespace
///
/// Namespacing keeps folder listings and breadcrumb trails for the same
/// folder id from ever sharing an entry.
pub fn cache_key(namespace: &str, id: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Memoizes serializable values under string keys for a bounded duration
pub struct ContentCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    /// Serializes repopulation per key
    flights: KeyedLocks,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ContentCache {
    /// Create a cache over `store` using the system clock
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: impl CacheStore + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            clock,
            flights: KeyedLocks::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), StorageError> {
        let entry = self.entry_for(value, ttl)?;
        self.store.write(key, entry)?;
        debug!(key = key, ttl_secs = ttl.as_secs(), "Cached value");
        Ok(())
    }

    /// Get a live value for `key`
    ///
    /// Returns Ok(None) on miss, on expiry, and when the stored payload no
    /// longer decodes as `T` (that entry is dropped).
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let entry = self.store.read(key)?;
        let value = self.decode(key, entry)?;
        self.record(key, value.is_some());
        Ok(value)
    }

    /// Remove the entry for `key`; absent keys are fine
    pub fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove(key)?;
        debug!(key = key, "Cleared cache entry");
        Ok(())
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result
    ///
    /// Concurrent callers missing on the same key are serialized: the first
    /// one fetches, the rest find its stored result. A zero `ttl` bypasses
    /// the cache entirely. Nothing is stored when `fetch` fails. Each call
    /// counts as exactly one hit or one miss.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StorageError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if ttl.is_zero() {
            return fetch().await;
        }

        let entry = self.read_entry(key).await?;
        let cached = self.decode(key, entry)?;
        self.record(key, cached.is_some());
        if let Some(value) = cached {
            return Ok(value);
        }

        let _flight = self.flights.lock(key).await;

        // Another caller may have filled it while we waited
        let entry = self.read_entry(key).await?;
        if let Some(value) = self.decode(key, entry)? {
            return Ok(value);
        }

        let value = fetch().await?;
        let entry = self.entry_for(&value, ttl)?;
        self.write_entry(key, entry).await?;
        debug!(key = key, ttl_secs = ttl.as_secs(), "Cached value");
        Ok(value)
    }

    fn entry_for<T: Serialize>(&self, value: &T, ttl: Duration) -> Result<StoredEntry, StorageError> {
        let value = serde_json::to_value(value)?;
        Ok(StoredEntry::new(value, self.clock.now_ms(), ttl))
    }

    /// Expiry and decoding of a raw entry, without touching the counters
    fn decode<T: DeserializeOwned>(
        &self,
        key: &str,
        entry: Option<StoredEntry>,
    ) -> Result<Option<T>, StorageError> {
        let entry = match entry {
            Some(entry) if !entry.is_expired(self.clock.now_ms()) => entry,
            Some(_) => {
                trace!(key = key, "Cache entry expired");
                return Ok(None);
            }
            None => return Ok(None),
        };

        match serde_json::from_value(entry.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = key, error = %e, "Dropping undecodable cache entry");
                self.store.remove(key)?;
                Ok(None)
            }
        }
    }

    fn record(&self, key: &str, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = key, "Cache HIT");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = key, "Cache MISS");
        }
    }

    /// Read on the blocking pool when the store does file I/O
    async fn read_entry(&self, key: &str) -> Result<Option<StoredEntry>, StorageError> {
        if !self.store.is_blocking() {
            return self.store.read(key);
        }
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.read(&key))
            .await
            .map_err(|e| StorageError::Io(io::Error::other(e)))?
    }

    async fn write_entry(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError> {
        if !self.store.is_blocking() {
            return self.store.write(key, entry);
        }
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.write(&key, entry))
            .await
            .map_err(|e| StorageError::Io(io::Error::other(e)))?
    }

    /// Get cache statistics
    ///
    /// Returns (hits, misses, hit_rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }

    /// Log current cache metrics
    pub fn log_metrics(&self) {
        let (hits, misses, hit_rate) = self.stats();

        debug!(
            hits = hits,
            misses = misses,
            hit_rate = format!("{:.1}%", hit_rate),
            entries = ?self.store.entry_count(),
            "Cache metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::{FileStore, MemoryStore};
    use std::sync::atomic::AtomicUsize;

    fn cache_with_clock() -> (Arc<ManualClock>, ContentCache) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = ContentCache::with_clock(MemoryStore::new(), clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_cache_key_is_stable_and_namespaced() {
        assert_eq!(cache_key("contents", "f1"), cache_key("contents", "f1"));
        assert_ne!(cache_key("contents", "f1"), cache_key("crumbs", "f1"));
        assert_ne!(cache_key("contents", "f1"), cache_key("contents", "f2"));
        assert_eq!(cache_key("contents", "f1").len(), 40);
    }

    #[test]
    fn test_store_get_within_ttl() {
        let (clock, cache) = cache_with_clock();
        cache.store("k", &vec!["a", "b"], Duration::from_secs(60)).unwrap();

        clock.advance(Duration::from_secs(59));
        let value: Option<Vec<String>> = cache.get("k").unwrap();
        assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let (clock, cache) = cache_with_clock();
        cache.store("k", &42u32, Duration::from_secs(60)).unwrap();

        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get::<u32>("k").unwrap(), None);
    }

    #[test]
    fn test_clear_then_get_is_absent() {
        let (_clock, cache) = cache_with_clock();
        cache.store("k", &"v", Duration::from_secs(3600)).unwrap();
        cache.clear("k").unwrap();
        assert_eq!(cache.get::<String>("k").unwrap(), None);

        // Clearing a missing key is a no-op
        cache.clear("never-stored").unwrap();
    }

    #[test]
    fn test_last_writer_wins() {
        let (clock, cache) = cache_with_clock();
        cache.store("k", &1u32, Duration::from_secs(3600)).unwrap();
        cache.store("k", &2u32, Duration::from_secs(10)).unwrap();

        assert_eq!(cache.get::<u32>("k").unwrap(), Some(2));
        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.get::<u32>("k").unwrap(), None);
    }

    #[test]
    fn test_undecodable_payload_is_dropped() {
        let (_clock, cache) = cache_with_clock();
        cache.store("k", &"not a number", Duration::from_secs(60)).unwrap();

        assert_eq!(cache.get::<u32>("k").unwrap(), None);
        // The bad entry is gone even for a reader of the right type
        assert_eq!(cache.get::<String>("k").unwrap(), None);
    }

    #[test]
    fn test_stats() {
        let (_clock, cache) = cache_with_clock();
        assert!(cache.get::<u32>("k").unwrap().is_none());
        cache.store("k", &1u32, Duration::from_secs(60)).unwrap();
        assert!(cache.get::<u32>("k").unwrap().is_some());

        let (hits, misses, hit_rate) = cache.stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 1);
        assert!(hit_rate > 49.0 && hit_rate < 51.0);
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success_only() {
        let (_clock, cache) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        let failed: Result<u32, StorageError> = cache
            .get_or_fetch("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StorageError::Io(std::io::Error::other("remote down")))
            })
            .await;
        assert!(failed.is_err());
        assert_eq!(cache.get::<u32>("k").unwrap(), None);

        for _ in 0..2 {
            let value: Result<u32, StorageError> = cache
                .get_or_fetch("k", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let (_clock, cache) = cache_with_clock();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<u32, StorageError> = cache
                .get_or_fetch("k", Duration::ZERO, || async {
                    Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
                })
                .await;
            value.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.get::<u32>("k").unwrap(), None);
    }

    #[tokio::test]
    async fn test_cold_fetch_counts_one_miss() {
        let (_clock, cache) = cache_with_clock();

        let value: Result<u32, StorageError> = cache
            .get_or_fetch("k", Duration::from_secs(60), || async { Ok(7) })
            .await;
        assert_eq!(value.unwrap(), 7);
        assert_eq!(cache.stats(), (0, 1, 0.0));

        let value: Result<u32, StorageError> = cache
            .get_or_fetch("k", Duration::from_secs(60), || async { Ok(8) })
            .await;
        assert_eq!(value.unwrap(), 7);
        assert_eq!(cache.stats(), (1, 1, 50.0));
    }

    #[tokio::test]
    async fn test_get_or_fetch_over_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(FileStore::new(dir.path().to_path_buf()).unwrap());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<Vec<String>, StorageError> = cache
                .get_or_fetch("k", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["a".to_string()])
                })
                .await;
            assert_eq!(value.unwrap(), vec!["a".to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), (1, 1, 50.0));
        assert_eq!(cache.get::<Vec<String>>("k").unwrap(), Some(vec!["a".to_string()]));
    }
}
