//! Cache storage errors

/// Failure of the cache backing medium
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
