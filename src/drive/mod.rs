//! Google Drive v3 API client

pub mod client;
pub mod errors;
pub mod types;

use async_trait::async_trait;

pub use client::{DriveClient, ErrorEntry};
pub use errors::DriveError;
pub use types::*;

/// Read-only view of a remote folder hierarchy
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Immediate, non-trashed children of `folder_id`, in remote order
    async fn list_children(
        &self,
        folder_id: &str,
        page_size: u32,
    ) -> Result<Vec<FolderEntry>, DriveError>;

    /// Name and parent of a single folder
    async fn get_metadata(&self, folder_id: &str) -> Result<FolderMetadata, DriveError>;

    /// Connection health label reported to status callers
    fn health_status(&self) -> &'static str {
        "healthy"
    }

    /// Most recent failed requests, oldest first
    fn recent_errors(&self) -> Vec<ErrorEntry> {
        Vec::new()
    }
}
