use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::VirtualPath;
use crate::error::{ProviderError, Result};

/// Provider tag reported by every record
pub const PROVIDER: &str = "box";

/// Kind of remote entry, taken from the `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    /// Anything that is not a folder is treated as a file
    pub fn of(raw: &Value) -> Self {
        match raw.get("type").and_then(Value::as_str) {
            Some("folder") => EntryKind::Folder,
            _ => EntryKind::File,
        }
    }
}

/// Remote identifier of a raw entry. Ids are strings on the wire, but
/// numeric ids are accepted too.
pub fn entry_id(raw: &Value) -> Option<String> {
    match raw.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn entry_name(raw: &Value) -> Option<&str> {
    raw.get("name").and_then(Value::as_str)
}

/// Id of the folder containing a raw entry (`parent.id`)
pub fn parent_id(raw: &Value) -> Option<String> {
    raw.get("parent").and_then(entry_id)
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(String::from)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    pub id: String,
    pub name: String,
    /// Virtual path of the file, reconstructed from where it was found
    pub path: String,
    pub size: Option<u64>,
    /// Raw `modified_at` timestamp
    pub modified: Option<String>,
    /// Id of the containing folder
    pub folder: Option<String>,
    pub etag: Option<String>,
}

impl FileMetadata {
    /// Build from a raw file entry found under `prefix`
    pub fn from_raw(raw: &Value, prefix: &VirtualPath) -> Result<Self> {
        let id = entry_id(raw)
            .ok_or_else(|| ProviderError::MalformedRecord("file entry without id".into()))?;
        let name = entry_name(raw)
            .ok_or_else(|| ProviderError::MalformedRecord(format!("file {id} without name")))?;

        Ok(FileMetadata {
            path: prefix.join(name, false).to_string(),
            name: name.to_string(),
            size: raw.get("size").and_then(Value::as_u64),
            modified: string_field(raw, "modified_at"),
            folder: parent_id(raw),
            etag: string_field(raw, "etag"),
            id,
        })
    }

    /// Box does not report a content type
    pub fn content_type(&self) -> Option<&str> {
        None
    }

    pub fn modified_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.modified.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderMetadata {
    pub id: String,
    pub name: String,
    /// Virtual path of the folder, always with a trailing `/`
    pub path: String,
}

impl FolderMetadata {
    pub fn from_raw(raw: &Value, prefix: &VirtualPath) -> Result<Self> {
        let id = entry_id(raw)
            .ok_or_else(|| ProviderError::MalformedRecord("folder entry without id".into()))?;
        let name = entry_name(raw)
            .ok_or_else(|| ProviderError::MalformedRecord(format!("folder {id} without name")))?;

        Ok(FolderMetadata {
            path: prefix.join(name, true).to_string(),
            name: name.to_string(),
            id,
        })
    }
}

/// One entry of a file's version history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevisionMetadata {
    pub version: String,
    /// Raw `modified_at` (or `modified`) timestamp
    pub modified: Option<String>,
}

impl RevisionMetadata {
    /// Version id comes from `id`, or else from the second segment of
    /// `path` (`"/v1/123456"` yields `"123456"`). The timestamp falls back
    /// from `modified_at` to `modified`.
    pub fn from_raw(raw: &Value) -> Result<Self> {
        let version = entry_id(raw)
            .or_else(|| {
                raw.get("path")
                    .and_then(Value::as_str)
                    .and_then(|p| p.split('/').filter(|s| !s.is_empty()).nth(1))
                    .map(String::from)
            })
            .ok_or_else(|| ProviderError::MalformedRecord("revision without id or path".into()))?;

        let modified = string_field(raw, "modified_at").or_else(|| string_field(raw, "modified"));

        Ok(RevisionMetadata { version, modified })
    }

    pub fn version_identifier(&self) -> &'static str {
        "revision"
    }

    pub fn modified_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.modified.as_deref())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalized view of a remote entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Metadata {
    File(FileMetadata),
    Folder(FolderMetadata),
    Revision(RevisionMetadata),
}

impl Metadata {
    /// Normalize a raw file or folder entry, selected by its `type` field
    pub fn from_entry(raw: &Value, prefix: &VirtualPath) -> Result<Self> {
        match EntryKind::of(raw) {
            EntryKind::Folder => Ok(Metadata::Folder(FolderMetadata::from_raw(raw, prefix)?)),
            EntryKind::File => Ok(Metadata::File(FileMetadata::from_raw(raw, prefix)?)),
        }
    }

    pub fn provider(&self) -> &'static str {
        PROVIDER
    }

    /// Entry name; revisions have none
    pub fn name(&self) -> Option<&str> {
        match self {
            Metadata::File(f) => Some(&f.name),
            Metadata::Folder(f) => Some(&f.name),
            Metadata::Revision(_) => None,
        }
    }

    /// Virtual path; revisions have none
    pub fn path(&self) -> Option<&str> {
        match self {
            Metadata::File(f) => Some(&f.path),
            Metadata::Folder(f) => Some(&f.path),
            Metadata::Revision(_) => None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Metadata::Folder(_))
    }

    pub fn as_file(&self) -> Option<&FileMetadata> {
        match self {
            Metadata::File(f) => Some(f),
            _ => None,
        }
    }
}

/// Outcome of resolving a path: one entry for file paths, the children
/// of the folder for directory paths
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    Entry(T),
    Listing(Vec<T>),
}

impl<T> Resolved<T> {
    pub fn entry(self) -> Option<T> {
        match self {
            Resolved::Entry(e) => Some(e),
            Resolved::Listing(_) => None,
        }
    }

    pub fn listing(self) -> Option<Vec<T>> {
        match self {
            Resolved::Listing(l) => Some(l),
            Resolved::Entry(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn root() -> VirtualPath {
        VirtualPath::new("/", "/").unwrap()
    }

    #[test]
    fn test_file_from_raw() {
        let prefix = VirtualPath::new("/", "/docs/").unwrap();
        let raw = json!({
            "type": "file",
            "id": "5000948880",
            "name": "report.txt",
            "size": 629644,
            "modified_at": "2012-12-12T10:55:30-08:00",
            "etag": "3",
            "parent": {"type": "folder", "id": "11446498"}
        });

        let meta = Metadata::from_entry(&raw, &prefix).unwrap();
        let file = meta.as_file().unwrap();
        assert_eq!(file.path, "/docs/report.txt");
        assert_eq!(file.size, Some(629644));
        assert_eq!(file.folder.as_deref(), Some("11446498"));
        assert_eq!(file.etag.as_deref(), Some("3"));
        assert_eq!(file.content_type(), None);
        assert_eq!(
            file.modified_utc().unwrap().to_rfc3339(),
            "2012-12-12T18:55:30+00:00"
        );
        assert_eq!(meta.provider(), "box");
        assert_eq!(meta.name(), Some("report.txt"));
    }

    #[test]
    fn test_folder_from_raw() {
        let raw = json!({"type": "folder", "id": "11446498", "name": "docs"});
        let meta = Metadata::from_entry(&raw, &root()).unwrap();
        assert!(meta.is_folder());
        assert_eq!(meta.path(), Some("/docs/"));
    }

    #[test]
    fn test_missing_name_is_malformed() {
        let raw = json!({"type": "file", "id": "1"});
        let err = Metadata::from_entry(&raw, &root()).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedRecord(_)));
    }

    #[test]
    fn test_revision_prefers_id() {
        let raw = json!({"id": "672259576", "modified_at": "2012-12-12T10:55:30-08:00"});
        let rev = RevisionMetadata::from_raw(&raw).unwrap();
        assert_eq!(rev.version, "672259576");
        assert_eq!(rev.modified.as_deref(), Some("2012-12-12T10:55:30-08:00"));
        assert_eq!(rev.version_identifier(), "revision");
    }

    #[test]
    fn test_revision_falls_back_to_path_and_modified() {
        let raw = json!({"path": "/v1/123456", "modified": "2013-01-01T00:00:00Z"});
        let rev = RevisionMetadata::from_raw(&raw).unwrap();
        assert_eq!(rev.version, "123456");
        assert_eq!(rev.modified.as_deref(), Some("2013-01-01T00:00:00Z"));
    }

    #[test]
    fn test_revision_without_identifier() {
        let raw = json!({"modified_at": "2013-01-01T00:00:00Z"});
        assert!(RevisionMetadata::from_raw(&raw).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let raw = json!({"type": "folder", "id": "7", "name": "docs"});
        let meta = Metadata::from_entry(&raw, &root()).unwrap();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["kind"], "folder");
        assert_eq!(value["path"], "/docs/");
    }
}
