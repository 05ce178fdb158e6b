//! Cloud provider trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use cloudface_common::{AuthParams, Result};

/// Normalized metadata for a remote file or folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntryMetadata {
    /// Path of the entry on the remote store.
    pub path: String,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Creation time as reported by the provider.
    pub created: Option<DateTime<Utc>>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
    pub mime_type: Option<String>,
    /// Provider icon hint (e.g. `folder`, `page_white_acrobat`).
    pub icon: Option<String>,
    pub permission: Option<String>,
    /// Folder hash for directories, file revision for files.
    pub revision: Option<String>,
    /// Direct children of a directory listing, one level deep.
    /// Always `None` for files.
    pub items: Option<Vec<RemoteEntryMetadata>>,
}

/// Options accepted by [`CloudProvider::upload`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Replace an existing remote file instead of keeping both (Dropbox).
    pub overwrite: bool,
    /// Endpoint region overriding the provider default (Amazon S3).
    pub region: Option<String>,
    /// Content type sent with the object; guessed from the file
    /// extension when unset.
    pub content_type: Option<String>,
}

impl UploadOptions {
    /// Content type for `file`: the explicit override, else the type its
    /// extension maps to, else `application/octet-stream`.
    pub fn content_type(&self, file: &Path) -> String {
        match &self.content_type {
            Some(content_type) => content_type.clone(),
            None => mime_guess::from_path(file).first_or_octet_stream().to_string(),
        }
    }
}

/// Options accepted by [`CloudProvider::download`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    /// Replace an existing local file. Defaults to `true`.
    pub overwrite: bool,
    /// Directory used when the caller passes an empty destination.
    pub default_path: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            overwrite: true,
            default_path: None,
        }
    }
}

/// Unified storage operations implemented by every provider.
///
/// Each implementation owns its credentials; nothing is shared between
/// instances. A provider must not be used from several tasks while
/// `authorize` may run, which `&mut self` enforces.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Get the provider name (e.g., "amazon_s3", "dropbox", "gdrive").
    fn name(&self) -> &str;

    /// Store the credentials used by every later request.
    ///
    /// # Postconditions
    /// - On success, later calls send with the new credentials
    /// - On failure, previously stored credentials are kept
    ///
    /// # Errors
    /// - Required parameter missing
    /// - Token exchange rejected by the provider
    async fn authorize(&mut self, params: &AuthParams) -> Result<()>;

    /// Upload the local `file` into the remote folder or bucket `path`.
    ///
    /// # Preconditions
    /// - Provider is authorized
    /// - `file` exists locally
    ///
    /// # Postconditions
    /// - The remote object is named after the local file's base name
    /// - Transfers are sequential; no request is retried
    ///
    /// # Errors
    /// - Local file not found
    /// - Any non-success response while transferring
    async fn upload(&self, file: &Path, path: &str, options: &UploadOptions) -> Result<()>;

    /// Download the remote `file` into the local directory `path`.
    ///
    /// # Preconditions
    /// - `path` is an existing directory, or empty with
    ///   `options.default_path` set
    ///
    /// # Postconditions
    /// - Returns the path of the written file
    /// - With `overwrite` off, an existing local file is left untouched
    ///
    /// # Errors
    /// - Destination directory missing
    /// - Local file exists and `overwrite` is off
    /// - Non-success response from the provider
    async fn download(&self, file: &str, path: &Path, options: &DownloadOptions)
        -> Result<PathBuf>;

    /// Create a folder; `path` includes the new folder's name.
    async fn create_folder(&self, path: &str) -> Result<()>;

    /// Delete a file or folder.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Move a file or folder; `to_path` includes the new name.
    async fn move_path(&self, from_path: &str, to_path: &str) -> Result<()>;

    /// Copy a file or folder; `to_path` includes the new name.
    async fn copy_path(&self, from_path: &str, to_path: &str) -> Result<()>;

    /// List a file or folder (folders include their direct children).
    async fn list_data(&self, path: &str) -> Result<RemoteEntryMetadata>;
}
