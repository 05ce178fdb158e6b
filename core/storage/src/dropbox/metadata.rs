//! Dropbox metadata responses and their normalization.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::provider::RemoteEntryMetadata;

/// Metadata object as returned by the Dropbox `/metadata` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DropboxMetadata {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default)]
    pub bytes: u64,
    /// Server-side modification time (RFC 2822).
    #[serde(default)]
    pub modified: Option<String>,
    /// Modification time reported by the uploading client (RFC 2822).
    #[serde(default)]
    pub client_mtime: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub read_only: Option<bool>,
    /// Folder hash (directories only).
    #[serde(default)]
    pub hash: Option<String>,
    /// File revision.
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub contents: Option<Vec<DropboxMetadata>>,
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|value| DateTime::parse_from_rfc2822(value).ok())
        .map(|at| at.with_timezone(&Utc))
}

/// Normalize a listing; direct children are included, their own
/// `contents` are not.
pub fn normalize(raw: DropboxMetadata) -> RemoteEntryMetadata {
    let items = match (raw.is_dir, raw.contents.clone()) {
        (true, Some(children)) => Some(children.into_iter().map(normalize_entry).collect()),
        _ => None,
    };

    RemoteEntryMetadata {
        items,
        ..normalize_entry(raw)
    }
}

fn normalize_entry(raw: DropboxMetadata) -> RemoteEntryMetadata {
    let revision = if raw.is_dir { raw.hash } else { raw.rev };

    RemoteEntryMetadata {
        path: raw.path,
        is_dir: raw.is_dir,
        size: raw.bytes,
        created: parse_timestamp(raw.client_mtime.as_deref()),
        last_modified: parse_timestamp(raw.modified.as_deref()),
        mime_type: raw.mime_type,
        icon: raw.icon,
        permission: raw
            .read_only
            .map(|read_only| if read_only { "read-only" } else { "read-write" }.to_string()),
        revision,
        items: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_folder_with_contents() {
        let raw: DropboxMetadata = serde_json::from_value(serde_json::json!({
            "size": "0 bytes",
            "hash": "abc",
            "bytes": 0,
            "thumb_exists": false,
            "rev": "714f029684fe",
            "modified": "Wed, 27 Apr 2011 22:18:51 +0000",
            "path": "/Photos",
            "is_dir": true,
            "icon": "folder",
            "root": "dropbox",
            "contents": [
                {
                    "size": "2.3 MB",
                    "rev": "38af1b183490",
                    "bytes": 2453963,
                    "modified": "Mon, 07 Apr 2008 23:13:19 +0000",
                    "client_mtime": "Mon, 07 Apr 2008 23:13:19 +0000",
                    "path": "/Photos/flower.jpg",
                    "is_dir": false,
                    "icon": "page_white_picture",
                    "mime_type": "image/jpeg"
                },
                {
                    "hash": "def",
                    "bytes": 0,
                    "path": "/Photos/2013",
                    "is_dir": true,
                    "icon": "folder"
                }
            ]
        }))
        .unwrap();

        let entry = normalize(raw);

        assert!(entry.is_dir);
        assert_eq!(entry.revision.as_deref(), Some("abc"));
        assert_eq!(entry.icon.as_deref(), Some("folder"));
        assert_eq!(
            entry.last_modified,
            Some(Utc.with_ymd_and_hms(2011, 4, 27, 22, 18, 51).unwrap())
        );

        let items = entry.items.expect("folder items");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].path, "/Photos/flower.jpg");
        assert_eq!(items[0].size, 2453963);
        assert_eq!(items[0].revision.as_deref(), Some("38af1b183490"));
        assert_eq!(items[0].mime_type.as_deref(), Some("image/jpeg"));
        assert!(items[0].created.is_some());
        assert!(items[0].items.is_none());
        assert_eq!(items[1].revision.as_deref(), Some("def"));
        assert!(items[1].items.is_none());
    }

    #[test]
    fn test_normalize_file() {
        let raw: DropboxMetadata = serde_json::from_value(serde_json::json!({
            "rev": "xyz",
            "bytes": 230783,
            "path": "/Getting_Started.pdf",
            "is_dir": false,
            "icon": "page_white_acrobat",
            "read_only": false,
            "mime_type": "application/pdf",
            "modified": "not a date"
        }))
        .unwrap();

        let entry = normalize(raw);

        assert!(!entry.is_dir);
        assert_eq!(entry.revision.as_deref(), Some("xyz"));
        assert_eq!(entry.items, None);
        assert_eq!(entry.size, 230783);
        assert_eq!(entry.permission.as_deref(), Some("read-write"));
        assert_eq!(entry.last_modified, None);
    }
}
