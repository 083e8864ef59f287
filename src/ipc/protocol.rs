//! IPC protocol definitions
//!
//! Newline-delimited JSON exchanged with browsing clients over a Unix
//! domain socket. Every message is tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::browser::{BrowseError, DisplayEntry};
use crate::drive::{Breadcrumb, ErrorEntry, FolderEntry};

/// Protocol version for future compatibility
pub const PROTOCOL_VERSION: u32 = 1;

/// Commands sent by a browsing client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Children of a folder in remote order; defaults to the session cursor
    #[serde(rename_all = "camelCase")]
    ListFolder {
        #[serde(default)]
        folder_id: Option<String>,
    },
    /// Trail from the top folder; defaults to the session cursor
    #[serde(rename_all = "camelCase")]
    GetBreadcrumbs {
        #[serde(default)]
        folder_id: Option<String>,
    },
    /// Open a folder and move the session cursor there
    #[serde(rename_all = "camelCase")]
    ChangeFolder { folder_id: String },
    /// Drop the cached listing and breadcrumbs of a folder
    #[serde(rename_all = "camelCase")]
    ClearFolder { folder_id: String },
    /// Daemon health and cache counters
    GetStatus,
}

/// Which layer a failed command came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Remote,
    Storage,
    CorruptHierarchy,
    InvalidRequest,
}

/// Responses sent back to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Contents {
        folder_id: String,
        files: Vec<FolderEntry>,
    },
    #[serde(rename_all = "camelCase")]
    Breadcrumbs {
        folder_id: String,
        breadcrumbs: Vec<Breadcrumb>,
    },
    /// Result of `changeFolder`, files in display order
    #[serde(rename_all = "camelCase")]
    Folder {
        current_folder: String,
        files: Vec<DisplayEntry>,
        breadcrumbs: Vec<Breadcrumb>,
    },
    #[serde(rename_all = "camelCase")]
    Success { message: Option<String> },
    #[serde(rename_all = "camelCase")]
    Error { error: String, kind: ErrorKind },
    #[serde(rename_all = "camelCase")]
    Status {
        version: u32,
        /// healthy, degraded or unhealthy
        health: String,
        cache_hits: u64,
        cache_misses: u64,
        hit_rate: f64,
        recent_errors: Vec<ErrorEntry>,
    },
}

impl Response {
    pub fn invalid_request(error: impl Into<String>) -> Self {
        Response::Error {
            error: error.into(),
            kind: ErrorKind::InvalidRequest,
        }
    }
}

impl From<&BrowseError> for Response {
    fn from(err: &BrowseError) -> Self {
        let kind = match err {
            BrowseError::Remote(_) => ErrorKind::Remote,
            BrowseError::Storage(_) => ErrorKind::Storage,
            BrowseError::CorruptHierarchy { .. } => ErrorKind::CorruptHierarchy,
        };
        Response::Error {
            error: err.to_string(),
            kind,
        }
    }
}

/// Parse a JSON command from bytes
pub fn parse_command(data: &[u8]) -> Result<Command, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Serialize a response to JSON bytes
pub fn serialize_response(response: &Response) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_vec(response)?;
    json.push(b'\n');
    Ok(json)
}
