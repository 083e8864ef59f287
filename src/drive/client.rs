//! Google Drive API Client
//!
//! Provides authenticated read-only access to Drive v3 for folder listing
//! and parent-chain lookups.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::DriveError;
use super::types::{DriveFile, FileListResponse, FolderEntry, FolderMetadata};
use super::DriveApi;
use crate::config::Config;

/// Fields requested from `files.list`
const LIST_FIELDS: &str =
    "nextPageToken, files(id, name, mimeType, webViewLink, size, modifiedTime, trashed)";

/// Fields requested from `files.get` during the breadcrumb walk
const METADATA_FIELDS: &str = "id, name, parents";

/// Backoff schedule between transport retries
const BACKOFF_MS: [u64; 3] = [500, 1000, 2000];

/// Maximum number of recent errors to track
const MAX_ERROR_HISTORY: usize = 10;

/// Health status values
pub const HEALTH_HEALTHY: u8 = 0;
pub const HEALTH_DEGRADED: u8 = 1;
pub const HEALTH_UNHEALTHY: u8 = 2;

/// A recent error entry for tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub timestamp: u64,
    pub operation: String,
    pub folder_id: String,
    pub error: String,
}

/// Drive API client for making authenticated requests
#[derive(Clone)]
pub struct DriveClient {
    /// HTTP client with the request timeout applied
    http_client: Client,
    /// Base URL, e.g. https://www.googleapis.com
    api_url: String,
    /// OAuth bearer token
    access_token: String,
    /// Transport retries for retryable errors
    max_retries: u32,
    /// Connection health (0=healthy, 1=degraded, 2=unhealthy)
    health: Arc<AtomicU8>,
    /// Recent error log
    error_log: Arc<RwLock<VecDeque<ErrorEntry>>>,
}

impl DriveClient {
    /// Create a client against `api_url` using a bearer access token
    pub fn new(
        api_url: &str,
        access_token: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, DriveError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DriveError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            max_retries,
            health: Arc::new(AtomicU8::new(HEALTH_HEALTHY)),
            error_log: Arc::new(RwLock::new(VecDeque::with_capacity(MAX_ERROR_HISTORY))),
        })
    }

    /// Build a client from loaded configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let token = config.access_token.as_deref().ok_or_else(|| {
            anyhow::anyhow!("DRIVE_ACCESS_TOKEN is not set; cannot reach the Drive API")
        })?;
        let client = Self::new(
            &config.api_url,
            token,
            config.request_timeout,
            config.max_retries,
        )?;
        info!(api_url = %client.api_url, "Drive client ready");
        Ok(client)
    }

    /// Execute an operation with retry logic and exponential backoff
    async fn with_retry<F, Fut, T>(&self, operation: &str, folder_id: &str, f: F) -> Result<T, DriveError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, DriveError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(result) => {
                    self.health.store(HEALTH_HEALTHY, Ordering::Relaxed);
                    return Ok(result);
                }
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.max_retries {
                        match e {
                            DriveError::Network(_) | DriveError::Timeout => {
                                self.health.store(HEALTH_UNHEALTHY, Ordering::Relaxed)
                            }
                            DriveError::RateLimited | DriveError::Server(_, _) => {
                                self.health.store(HEALTH_DEGRADED, Ordering::Relaxed)
                            }
                            _ => {}
                        }
                        self.log_error(operation, folder_id, &e.to_string());
                        return Err(e);
                    }

                    let delay = BACKOFF_MS
                        .get(attempt as usize)
                        .copied()
                        .unwrap_or(2000);
                    warn!(
                        operation = operation,
                        folder_id = folder_id,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "Retrying Drive request"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Issue an authenticated GET and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, DriveError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::from_status(status.as_u16(), &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DriveError::Decode(e.to_string()))
    }

    /// Log an error to the error history ring buffer
    fn log_error(&self, operation: &str, folder_id: &str, error: &str) {
        let entry = ErrorEntry {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            operation: operation.to_string(),
            folder_id: folder_id.to_string(),
            error: error.to_string(),
        };

        let mut log = self.error_log.write().unwrap_or_else(|e| e.into_inner());
        if log.len() >= MAX_ERROR_HISTORY {
            log.pop_front();
        }
        log.push_back(entry);
    }

    /// Get connection health status string
    pub fn health_status(&self) -> &'static str {
        match self.health.load(Ordering::Relaxed) {
            HEALTH_HEALTHY => "healthy",
            HEALTH_DEGRADED => "degraded",
            _ => "unhealthy",
        }
    }

    /// Get recent errors
    pub fn recent_errors(&self) -> Vec<ErrorEntry> {
        self.error_log
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// List the non-trashed children of a folder, following every page
    ///
    /// # Arguments
    /// * `folder_id` - Parent folder ID (or the `root` alias)
    /// * `page_size` - Items requested per page
    pub async fn fetch_children(
        &self,
        folder_id: &str,
        page_size: u32,
    ) -> Result<Vec<FolderEntry>, DriveError> {
        let url = format!("{}/drive/v3/files", self.api_url);
        let query = children_query(folder_id);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.clone()),
                ("fields", LIST_FIELDS.to_string()),
                ("pageSize", page_size.to_string()),
                ("supportsAllDrives", "true".to_string()),
                ("includeItemsFromAllDrives", "true".to_string()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }

            debug!(folder_id = folder_id, page_token = ?page_token, "Listing folder from Drive");

            let page: FileListResponse = self
                .with_retry("list_children", folder_id, || self.get_json(&url, &params))
                .await?;

            match merge_page(&mut entries, page) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(folder_id = folder_id, count = entries.len(), "Listed folder from Drive");
        Ok(entries)
    }

    /// Look up a folder's name and first parent
    pub async fn fetch_metadata(&self, folder_id: &str) -> Result<FolderMetadata, DriveError> {
        let url = format!(
            "{}/drive/v3/files/{}",
            self.api_url,
            urlencoding::encode(folder_id)
        );
        let params = [
            ("fields", METADATA_FIELDS.to_string()),
            ("supportsAllDrives", "true".to_string()),
        ];

        debug!(folder_id = folder_id, "Fetching folder metadata from Drive");

        let file: DriveFile = self
            .with_retry("get_metadata", folder_id, || self.get_json(&url, &params))
            .await?;

        Ok(FolderMetadata::from(file))
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_children(
        &self,
        folder_id: &str,
        page_size: u32,
    ) -> Result<Vec<FolderEntry>, DriveError> {
        self.fetch_children(folder_id, page_size).await
    }

    async fn get_metadata(&self, folder_id: &str) -> Result<FolderMetadata, DriveError> {
        self.fetch_metadata(folder_id).await
    }

    fn health_status(&self) -> &'static str {
        DriveClient::health_status(self)
    }

    fn recent_errors(&self) -> Vec<ErrorEntry> {
        DriveClient::recent_errors(self)
    }
}

/// Append the live entries of one `files.list` page and return the token
/// of the next page, if any
fn merge_page(entries: &mut Vec<FolderEntry>, page: FileListResponse) -> Option<String> {
    entries.extend(
        page.files
            .into_iter()
            .filter(|f| !f.trashed)
            .map(FolderEntry::from),
    );
    page.next_page_token
}

/// Build the `files.list` query selecting live children of a folder
fn children_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents and trashed = false", escaped)
}
