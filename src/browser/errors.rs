//! Folder browsing errors

use crate::cache::StorageError;
use crate::drive::DriveError;

/// Anything that stops a listing or breadcrumb lookup from completing
#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("Remote fetch failed: {0}")]
    Remote(#[from] DriveError),

    #[error("Cache storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Folder hierarchy above '{folder_id}' is corrupt: no root reached after {hops} hops")]
    CorruptHierarchy { folder_id: String, hops: usize },
}
