//! Folder Browser
//!
//! Cached folder listings and breadcrumb trails for one browsing session.
//! The cache and Drive client are shared; the cursor belongs to the session.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::errors::BrowseError;
use super::listing::{display_entries, DisplayEntry};
use crate::cache::{cache_key, ContentCache};
use crate::config::{Config, ROOT_FOLDER_ALIAS};
use crate::drive::{Breadcrumb, DriveApi, FolderEntry};

const CONTENTS_NAMESPACE: &str = "contents";
const CRUMBS_NAMESPACE: &str = "crumbs";

/// Tunables shared by every session
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Zero disables caching
    pub cache_ttl: Duration,
    pub page_size: u32,
    /// Upper bound on breadcrumb hops
    pub max_depth: usize,
    /// Breadcrumbs stop at this folder even if it has parents
    pub root_folder_id: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            page_size: 50,
            max_depth: 64,
            root_folder_id: None,
        }
    }
}

impl From<&Config> for BrowserSettings {
    fn from(config: &Config) -> Self {
        Self {
            cache_ttl: config.cache_ttl,
            page_size: config.page_size,
            max_depth: config.max_depth,
            root_folder_id: config.root_folder_id.clone(),
        }
    }
}

/// Everything a caller needs to render one folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderView {
    pub current_folder: String,
    /// Display order: folders first, then by name
    pub files: Vec<DisplayEntry>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// One browsing session over a shared cache and Drive client
pub struct FolderBrowser {
    drive: Arc<dyn DriveApi>,
    cache: Arc<ContentCache>,
    settings: BrowserSettings,
    /// Session cursor
    current_folder_id: String,
}

impl FolderBrowser {
    pub fn new(
        drive: Arc<dyn DriveApi>,
        cache: Arc<ContentCache>,
        settings: BrowserSettings,
        start_folder_id: impl Into<String>,
    ) -> Self {
        Self {
            drive,
            cache,
            settings,
            current_folder_id: start_folder_id.into(),
        }
    }

    pub fn current_folder(&self) -> &str {
        &self.current_folder_id
    }

    /// Move the cursor. No I/O.
    pub fn change_folder(&mut self, folder_id: impl Into<String>) {
        self.current_folder_id = folder_id.into();
        debug!(folder_id = %self.current_folder_id, "Changed current folder");
    }

    /// Immediate children of `folder_id` in remote order, using the
    /// configured page size
    pub async fn contents(&self, folder_id: &str) -> Result<Vec<FolderEntry>, BrowseError> {
        self.folder_contents(folder_id, self.settings.page_size).await
    }

    /// Immediate children of `folder_id` in remote order
    pub async fn folder_contents(
        &self,
        folder_id: &str,
        page_size: u32,
    ) -> Result<Vec<FolderEntry>, BrowseError> {
        let key = cache_key(CONTENTS_NAMESPACE, folder_id);
        self.cache
            .get_or_fetch(&key, self.settings.cache_ttl, || async {
                let entries = self.drive.list_children(folder_id, page_size).await?;
                info!(folder_id = folder_id, count = entries.len(), "Fetched folder contents");
                Ok::<_, BrowseError>(entries)
            })
            .await
    }

    /// Trail from the top folder down to and including `folder_id`
    pub async fn breadcrumbs(&self, folder_id: &str) -> Result<Vec<Breadcrumb>, BrowseError> {
        let key = cache_key(CRUMBS_NAMESPACE, folder_id);
        self.cache
            .get_or_fetch(&key, self.settings.cache_ttl, || self.walk_to_root(folder_id))
            .await
    }

    pub async fn current_contents(&self) -> Result<Vec<FolderEntry>, BrowseError> {
        self.contents(&self.current_folder_id).await
    }

    pub async fn current_breadcrumbs(&self) -> Result<Vec<Breadcrumb>, BrowseError> {
        self.breadcrumbs(&self.current_folder_id).await
    }

    /// Resolve `folder_id` for display and move the cursor there.
    /// The cursor only moves when both lookups succeed.
    pub async fn browse(&mut self, folder_id: &str) -> Result<FolderView, BrowseError> {
        let files = self.contents(folder_id).await?;
        let breadcrumbs = self.breadcrumbs(folder_id).await?;
        self.change_folder(folder_id);

        Ok(FolderView {
            current_folder: folder_id.to_string(),
            files: display_entries(files),
            breadcrumbs,
        })
    }

    /// Drop both cached views of `folder_id`
    pub fn invalidate(&self, folder_id: &str) -> Result<(), BrowseError> {
        self.cache.clear(&cache_key(CONTENTS_NAMESPACE, folder_id))?;
        self.cache.clear(&cache_key(CRUMBS_NAMESPACE, folder_id))?;
        info!(folder_id = folder_id, "Invalidated cached folder");
        Ok(())
    }

    fn is_boundary(&self, folder_id: &str) -> bool {
        folder_id == ROOT_FOLDER_ALIAS || self.settings.root_folder_id.as_deref() == Some(folder_id)
    }

    /// Walk parent links one remote call per hop, prepending each folder
    async fn walk_to_root(&self, folder_id: &str) -> Result<Vec<Breadcrumb>, BrowseError> {
        let mut trail: VecDeque<Breadcrumb> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = folder_id.to_string();

        loop {
            if trail.len() >= self.settings.max_depth || !visited.insert(current.clone()) {
                return Err(BrowseError::CorruptHierarchy {
                    folder_id: folder_id.to_string(),
                    hops: trail.len(),
                });
            }

            let metadata = self.drive.get_metadata(&current).await?;
            let stop = self.is_boundary(&current);
            trail.push_front(Breadcrumb::new(current, metadata.name));

            if stop {
                break;
            }
            match metadata.parent_id {
                Some(parent) => current = parent,
                None => break,
            }
        }

        debug!(folder_id = folder_id, depth = trail.len(), "Resolved breadcrumbs");
        Ok(trail.into())
    }
}
