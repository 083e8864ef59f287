//! In-Memory Cache Store
//!
//! Process-local backing store for cached folder data using Moka.
//! Each entry is evicted once its own TTL lapses.

use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;
use tracing::trace;

use super::errors::StorageError;
use super::store::{CacheStore, StoredEntry};

/// Default upper bound on resident entries
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Per-entry expiry policy driven by the TTL stored with each value
struct EntryExpiry;

impl Expiry<String, StoredEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl())
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // Overwrites take the new writer's TTL
        Some(value.ttl())
    }
}

/// Moka-backed store shared by every session in the process
pub struct MemoryStore {
    entries: Cache<String, StoredEntry>,
}

impl MemoryStore {
    /// Create a store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store holding at most `max_entries` entries
    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .name("folder_content_cache")
            .build();

        Self { entries }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>, StorageError> {
        Ok(self.entries.get(key))
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError> {
        trace!(key = key, ttl_ms = entry.ttl().as_millis() as u64, "Memory store write");
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.invalidate(key);
        Ok(())
    }

    fn entry_count(&self) -> Option<u64> {
        Some(self.entries.entry_count())
    }
}
