//! Drive API types and browser-facing entries
//!
//! Defines types for Google Drive v3 API responses and their conversion to
//! the plain `FolderEntry` / `Breadcrumb` data handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Deserialize an optional number that might be encoded as a string or null.
/// Drive encodes int64 fields such as `size` as JSON strings (e.g. "1024").
fn deserialize_flexible_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleU64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleU64Visitor {
        type Value = Option<u64>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Option<u64>, E> {
            Ok(Some(value))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Option<u64>, E> {
            u64::try_from(value)
                .map(Some)
                .map_err(|_| de::Error::custom("negative value for u64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Option<u64>, E> {
            value.parse::<u64>().map(Some).map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<u64>, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<u64>, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(FlexibleU64Visitor)
}

/// Drive file resource, restricted to the fields this crate requests
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    /// Byte size; absent for folders and Google-native documents
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// Response from `files.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    /// Token for the next page (None if no more files)
    pub next_page_token: Option<String>,
}

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Folder,
    File,
}

/// Immediate child of a folder, as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    /// Browser link, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
    /// Byte size, files only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FolderEntry {
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::Folder,
            web_link: None,
            size: None,
            modified_time: None,
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
        }
    }

    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: EntryKind::File,
            web_link: None,
            size: None,
            modified_time: None,
            mime_type: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

impl From<DriveFile> for FolderEntry {
    fn from(file: DriveFile) -> Self {
        // Links and sizes are only meaningful for files
        let mut entry = if file.is_folder() {
            FolderEntry::folder(file.id, file.name)
        } else {
            let mut entry = FolderEntry::file(file.id, file.name);
            entry.web_link = file.web_view_link;
            entry.size = file.size;
            entry
        };
        entry.modified_time = file.modified_time;
        entry.mime_type = file.mime_type;
        entry
    }
}

/// One `{id, name}` step of a breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub id: String,
    pub name: String,
}

impl Breadcrumb {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Metadata needed to walk one hop up the folder tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMetadata {
    pub id: String,
    pub name: String,
    /// First parent; None at the top of a drive
    pub parent_id: Option<String>,
}

impl DriveFile {
    /// Check if this entry represents a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }
}

impl From<DriveFile> for FolderMetadata {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            parent_id: file.parents.into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_file() {
        let json = r#"{
            "id": "d1",
            "name": "doc.txt",
            "mimeType": "text/plain",
            "webViewLink": "https://drive.google.com/file/d/d1/view",
            "size": "2048",
            "modifiedTime": "2024-03-01T12:30:00.000Z"
        }"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "d1");
        assert_eq!(file.size, Some(2048));
        assert!(!file.is_folder());
        assert!(!file.trashed);
        assert_eq!(
            file.modified_time.unwrap().to_rfc3339(),
            "2024-03-01T12:30:00+00:00"
        );
    }

    #[test]
    fn test_deserialize_folder_without_size() {
        let json = r#"{
            "id": "f1",
            "name": "X",
            "mimeType": "application/vnd.google-apps.folder",
            "webViewLink": "https://drive.google.com/drive/folders/f1"
        }"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert!(file.is_folder());
        assert_eq!(file.size, None);

        let entry = FolderEntry::from(file);
        assert_eq!(entry.kind, EntryKind::Folder);
        // Links and sizes are only carried for files
        assert_eq!(entry.web_link, None);
    }

    #[test]
    fn test_deserialize_numeric_and_null_size() {
        let json = r#"{"id": "a", "name": "a.bin", "size": 7}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.size, Some(7));

        let json = r#"{"id": "b", "name": "b.bin", "size": null}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.size, None);
    }

    #[test]
    fn test_deserialize_list_response() {
        let json = r#"{
            "nextPageToken": "tok-2",
            "files": [
                {"id": "f1", "name": "X", "mimeType": "application/vnd.google-apps.folder"},
                {"id": "d1", "name": "doc.txt", "mimeType": "text/plain", "size": "12"}
            ]
        }"#;
        let resp: FileListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.files.len(), 2);
        assert_eq!(resp.next_page_token.as_deref(), Some("tok-2"));

        let empty: FileListResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
        assert_eq!(empty.next_page_token, None);
    }

    #[test]
    fn test_metadata_takes_first_parent() {
        let json = r#"{"id": "f1", "name": "X", "parents": ["p1", "p2"]}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        let meta = FolderMetadata::from(file);
        assert_eq!(meta.parent_id.as_deref(), Some("p1"));

        let json = r#"{"id": "0AAroot", "name": "My Drive"}"#;
        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(FolderMetadata::from(file).parent_id, None);
    }

    #[test]
    fn test_entry_json_shape() {
        let mut entry = FolderEntry::file("d1", "doc.txt");
        entry.size = Some(5);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "file");
        assert_eq!(json["size"], 5);
        assert!(json.get("webLink").is_none());
    }
}
