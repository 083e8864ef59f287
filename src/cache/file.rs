//! Filesystem Cache Store
//!
//! Persists cached folder data as one JSON envelope per key so entries
//! survive daemon restarts and are shared between processes.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};

use super::errors::StorageError;
use super::store::{CacheStore, StoredEntry};

/// On-disk envelope; the full key guards against file name collisions
#[derive(Debug, Serialize, Deserialize)]
struct FileEnvelope {
    key: String,
    #[serde(flatten)]
    entry: StoredEntry,
}

/// Directory-backed cache store
pub struct FileStore {
    /// Root directory for cache entries
    cache_dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `cache_dir`
    pub fn new(cache_dir: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&cache_dir)?;

        let store = Self { cache_dir };

        // Clean up any stale temp files from previous runs
        store.cleanup();

        info!(cache_dir = %store.cache_dir.display(), "File cache store initialized");
        Ok(store)
    }

    /// Remove stale temp files left from interrupted writes
    pub fn cleanup(&self) {
        if let Ok(read_dir) = fs::read_dir(&self.cache_dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    debug!(path = %path.display(), "Removing stale temp file");
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }

    /// Delete entries that expired before `now_ms`, returning how many went
    pub fn prune(&self, now_ms: u64) -> Result<usize, StorageError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)?.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let expired = match fs::read(&path) {
                Ok(bytes) => serde_json::from_slice::<FileEnvelope>(&bytes)
                    .map(|env| env.entry.is_expired(now_ms))
                    .unwrap_or(true),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            if expired {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if removed > 0 {
            info!(removed = removed, "Pruned expired cache entries");
        }
        Ok(removed)
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Map a cache key to its file; keys are hashed so any string is safe
    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha1::new();
        hasher.update(key.as_bytes());
        self.cache_dir.join(format!("{:x}.json", hasher.finalize()))
    }
}

impl CacheStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>, StorageError> {
        let path = self.path_for(key);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<FileEnvelope>(&bytes) {
            Ok(envelope) if envelope.key == key => Ok(Some(envelope.entry)),
            Ok(envelope) => {
                warn!(key = key, stored_key = %envelope.key, "Cache file holds a different key");
                Ok(None)
            }
            Err(e) => {
                // Never hand back a half-written or foreign file
                warn!(key = key, path = %path.display(), error = %e, "Discarding unreadable cache file");
                let _ = fs::remove_file(&path);
                Ok(None)
            }
        }
    }

    fn write(&self, key: &str, entry: StoredEntry) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let envelope = FileEnvelope {
            key: key.to_string(),
            entry,
        };
        let data = serde_json::to_vec(&envelope)?;

        // Write atomically using tempfile
        let mut tmp = tempfile::Builder::new()
            .prefix(".entry-")
            .suffix(".tmp")
            .tempfile_in(&self.cache_dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(key = key, path = %path.display(), size = data.len(), "Stored cache file");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_blocking(&self) -> bool {
        true
    }
}
