//! Backing-store abstraction for the content cache

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::StorageError;

/// A serialized payload with its absolute expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    pub value: serde_json::Value,
    pub stored_at_ms: u64,
    pub expires_at_ms: u64,
}

impl StoredEntry {
    pub fn new(value: serde_json::Value, now_ms: u64, ttl: Duration) -> Self {
        Self {
            value,
            stored_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(ttl.as_millis() as u64),
        }
    }

    /// Valid while `now < expires_at`
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Lifetime the entry was stored with
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.expires_at_ms.saturating_sub(self.stored_at_ms))
    }
}

/// Durable key/value medium. Stores never interpret expiry; the
/// `ContentCache` checks it at read time.
pub trait CacheStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>, StorageError>;

    /// Overwrites any existing entry for `key`
    fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError>;

    /// No-op when `key` is absent
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Number of entries currently held, if cheap to compute
    fn entry_count(&self) -> Option<u64> {
        None
    }

    /// True when reads and writes hit the filesystem and belong off the
    /// async worker threads
    fn is_blocking(&self) -> bool {
        false
    }
}
