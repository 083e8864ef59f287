//! Folder browsing over the Drive API
//!
//! `FolderBrowser` pairs the shared content cache with a per-session
//! cursor; `listing` holds the display helpers.

pub mod errors;
pub mod folder;
pub mod listing;

pub use errors::BrowseError;
pub use folder::{BrowserSettings, FolderBrowser};
pub use listing::{DisplayEntry, FileCategory};

/// In-memory Drive stand-in with call counters
#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::drive::{DriveApi, DriveError, FolderEntry, FolderMetadata};

    #[derive(Default)]
    pub struct FakeDrive {
        folders: Mutex<HashMap<String, FolderMetadata>>,
        children: Mutex<HashMap<String, Vec<FolderEntry>>>,
        failure: Mutex<Option<DriveError>>,
        list_delay: Option<Duration>,
        list_calls: AtomicUsize,
        metadata_calls: AtomicUsize,
    }

    impl FakeDrive {
        pub fn new() -> Self {
            Self::default()
        }

        /// root ("My Drive") holds folder X (f1) then doc.txt (d1);
        /// X holds folder Y (f2)
        pub fn sample() -> Self {
            let drive = Self::new();
            drive.add_folder("root", "My Drive", None);
            drive.add_folder("f1", "X", Some("root"));
            drive.add_file("root", "d1", "doc.txt");
            drive.add_folder("f2", "Y", Some("f1"));
            drive
        }

        /// root holds doc.txt (d1), X (f1), a.txt (d2) in that order
        pub fn sample_with_unsorted_root() -> Self {
            let drive = Self::new();
            drive.add_folder("root", "My Drive", None);
            drive.add_file("root", "d1", "doc.txt");
            drive.add_folder("f1", "X", Some("root"));
            drive.add_file("root", "d2", "a.txt");
            drive
        }

        pub fn with_list_delay(mut self, delay: Duration) -> Self {
            self.list_delay = Some(delay);
            self
        }

        pub fn add_folder(&self, id: &str, name: &str, parent: Option<&str>) {
            self.folders.lock().unwrap().insert(
                id.to_string(),
                FolderMetadata {
                    id: id.to_string(),
                    name: name.to_string(),
                    parent_id: parent.map(String::from),
                },
            );

            let mut children = self.children.lock().unwrap();
            children.entry(id.to_string()).or_default();
            if let Some(parent) = parent {
                children
                    .entry(parent.to_string())
                    .or_default()
                    .push(FolderEntry::folder(id, name));
            }
        }

        pub fn add_file(&self, parent: &str, id: &str, name: &str) {
            let mut entry = FolderEntry::file(id, name);
            entry.mime_type = Some("text/plain".to_string());
            entry.size = Some(12);
            entry.web_link = Some(format!("https://drive.google.com/file/d/{}/view", id));
            self.children
                .lock()
                .unwrap()
                .entry(parent.to_string())
                .or_default()
                .push(entry);
        }

        /// Make every following call fail with `error` (None restores)
        pub fn fail_with(&self, error: Option<DriveError>) {
            *self.failure.lock().unwrap() = error;
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub fn metadata_calls(&self) -> usize {
            self.metadata_calls.load(Ordering::SeqCst)
        }

        fn check_failure(&self) -> Result<(), DriveError> {
            match self.failure.lock().unwrap().clone() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl DriveApi for FakeDrive {
        async fn list_children(
            &self,
            folder_id: &str,
            _page_size: u32,
        ) -> Result<Vec<FolderEntry>, DriveError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.list_delay {
                tokio::time::sleep(delay).await;
            }
            self.check_failure()?;

            self.children
                .lock()
                .unwrap()
                .get(folder_id)
                .cloned()
                .ok_or_else(|| DriveError::NotFound(format!("File not found: {}", folder_id)))
        }

        async fn get_metadata(&self, folder_id: &str) -> Result<FolderMetadata, DriveError> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            self.check_failure()?;

            self.folders
                .lock()
                .unwrap()
                .get(folder_id)
                .cloned()
                .ok_or_else(|| DriveError::NotFound(format!("File not found: {}", folder_id)))
        }
    }
}
