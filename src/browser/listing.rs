//! Display helpers for folder listings
//!
//! Ordering, file-type classification and size labels. These never touch
//! the cache: the cached listing keeps the remote order.

use serde::{Deserialize, Serialize};

use crate::drive::{EntryKind, FolderEntry, FOLDER_MIME_TYPE};

/// Coarse file type used to pick an icon or label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Folder,
    Document,
    Spreadsheet,
    Presentation,
    Pdf,
    Image,
    Text,
    Archive,
    Video,
    Audio,
    Generic,
}

impl FileCategory {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type {
            FOLDER_MIME_TYPE => FileCategory::Folder,
            "application/vnd.google-apps.document" => FileCategory::Document,
            "application/vnd.google-apps.spreadsheet" | "text/csv" => FileCategory::Spreadsheet,
            "application/vnd.google-apps.presentation" => FileCategory::Presentation,
            "application/pdf" => FileCategory::Pdf,
            "application/zip" | "application/x-zip-compressed" | "application/gzip"
            | "application/x-tar" | "application/x-7z-compressed" => FileCategory::Archive,
            m if m.starts_with("image/") => FileCategory::Image,
            m if m.starts_with("video/") => FileCategory::Video,
            m if m.starts_with("audio/") => FileCategory::Audio,
            m if m.starts_with("text/") => FileCategory::Text,
            _ => FileCategory::Generic,
        }
    }

    pub fn of(entry: &FolderEntry) -> Self {
        match entry.kind {
            EntryKind::Folder => FileCategory::Folder,
            EntryKind::File => entry
                .mime_type
                .as_deref()
                .map(Self::from_mime)
                .unwrap_or(FileCategory::Generic),
        }
    }
}

/// A listing entry decorated for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    #[serde(flatten)]
    pub entry: FolderEntry,
    pub category: FileCategory,
    /// Human readable size, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_label: Option<String>,
}

impl From<FolderEntry> for DisplayEntry {
    fn from(entry: FolderEntry) -> Self {
        let category = FileCategory::of(&entry);
        let size_label = match entry.kind {
            EntryKind::Folder => None,
            EntryKind::File => Some(human_size(entry.size.unwrap_or(0))),
        };
        Self {
            entry,
            category,
            size_label,
        }
    }
}

/// Folders first, then by name ignoring case. Stable, so entries with
/// equal names keep their remote order.
pub fn sort_for_display(entries: &mut [FolderEntry]) {
    entries.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// Sort a listing and decorate each entry for display
pub fn display_entries(mut entries: Vec<FolderEntry>) -> Vec<DisplayEntry> {
    sort_for_display(&mut entries);
    entries.into_iter().map(DisplayEntry::from).collect()
}

/// Format a byte count, e.g. `0 B`, `1.5 KB`, `2.25 GB`
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
