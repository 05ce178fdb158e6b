//! Google Drive API (v2) client.

use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use cloudface_common::{Error, Result};

use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::util::{encode_segment, local_file_size};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Status Drive answers with while a resumable upload is incomplete.
const RESUME_INCOMPLETE: u16 = 308;

/// Google Drive file resource (the fields this client reads).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub mime_type: String,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// Response of `GET /about`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct About {
    pub root_folder_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    items: Vec<DriveFile>,
}

/// An initiated resumable upload.
///
/// Keep this value to call `resume_interrupted_upload` after a failed
/// transfer; the session URI is all Drive needs to continue it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumableSession {
    pub session_uri: String,
    pub file: PathBuf,
    pub file_size: u64,
    pub mime_type: String,
}

/// Query matching a folder named `title` directly under `parent_id`.
pub fn folder_query(title: &str, parent_id: &str) -> String {
    format!(
        "title = '{}' and '{}' in parents and mimeType = '{}'",
        title.replace('\'', "\\'"),
        parent_id,
        FOLDER_MIME_TYPE
    )
}

/// Parse the upper bound of a `Range` header, `bytes=0-N` or bare `0-N`.
fn range_upper(range: &str) -> Option<u64> {
    let range = range.trim();
    let bounds = range.strip_prefix("bytes=").unwrap_or(range);
    let (lower, upper) = bounds.split_once('-')?;
    lower.trim().parse::<u64>().ok()?;
    upper.trim().parse().ok()
}

/// Google Drive API client.
///
/// Every call takes the bearer token explicitly; the client itself holds
/// no credentials.
pub struct DriveClient {
    transport: Arc<dyn Transport>,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(transport: Arc<dyn Transport>, api_base: impl Into<String>, upload_base: impl Into<String>) -> Self {
        Self {
            transport,
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.transport.send(request).await
    }

    /// Account information, including the root folder id.
    pub async fn about(&self, token: &str) -> Result<About> {
        let url = format!("{}/about", self.api_base);
        let response = self
            .send(HttpRequest::get(url).bearer(token))
            .await?
            .require_success()?;
        response.json()
    }

    /// Files matching a Drive search query.
    pub async fn find_files(&self, token: &str, query: &str) -> Result<Vec<DriveFile>> {
        let url = format!("{}/files?q={}", self.api_base, encode_segment(query));
        let response = self
            .send(HttpRequest::get(url).bearer(token))
            .await?
            .require_success()?;
        let list: FileList = response.json()?;
        Ok(list.items)
    }

    /// Initiate a resumable upload of `file` into the folder `parent_id`.
    ///
    /// # Errors
    /// - [`Error::FileNotFound`] if `file` is missing
    /// - [`Error::UploadFailed`] if Drive rejects the session or returns no
    ///   `Location` header
    pub async fn start_resumable_upload(
        &self,
        token: &str,
        file: &Path,
        title: &str,
        parent_id: &str,
        mime_type: &str,
    ) -> Result<ResumableSession> {
        let file_size = local_file_size(file).await?;
        let metadata = serde_json::json!({
            "title": title,
            "parents": [{"id": parent_id, "kind": "drive#parentReference"}]
        });
        let body = serde_json::to_vec(&metadata)
            .map_err(|e| Error::Serialization(format!("Failed to serialize metadata: {}", e)))?;

        let request = HttpRequest::post(format!("{}/files?uploadType=resumable", self.upload_base))
            .bearer(token)
            .header("X-Upload-Content-Type", mime_type)
            .header("X-Upload-Content-Length", file_size.to_string())
            .header("Content-Type", "application/json")
            .body(body);
        let response = self.send(request).await?.require_upload_success()?;

        let session_uri = match response.header("Location") {
            Some(location) => location.to_string(),
            None => {
                return Err(Error::UploadFailed {
                    status: response.status,
                    reason: "No upload URI in response".to_string(),
                    body: response.text(),
                })
            }
        };

        debug!("Started resumable upload for {}", title);
        Ok(ResumableSession {
            session_uri,
            file: file.to_path_buf(),
            file_size,
            mime_type: mime_type.to_string(),
        })
    }

    /// Send the session's file from byte `offset` to the end.
    ///
    /// Succeeds only on 200 or 201.
    pub async fn send_from(&self, token: &str, session: &ResumableSession, offset: u64) -> Result<()> {
        let len = session.file_size.saturating_sub(offset);
        let mut data = vec![0u8; len as usize];
        {
            let mut handle = File::open(&session.file).await?;
            handle.seek(SeekFrom::Start(offset)).await?;
            handle.read_exact(&mut data).await?;
        }

        let mut request = HttpRequest::put(session.session_uri.clone())
            .bearer(token)
            .header("Content-Type", session.mime_type.clone())
            .header("Content-Length", len.to_string());
        if offset > 0 {
            request = request.header(
                "Content-Range",
                format!("bytes {}-{}/{}", offset, session.file_size - 1, session.file_size),
            );
        }

        let response = self.send(request.body(data)).await?;
        match response.status {
            200 | 201 => Ok(()),
            _ => Err(response.into_upload_failed()),
        }
    }

    /// Ask Drive how much of the session it has stored.
    ///
    /// Returns the offset to continue from: one past the upper bound of
    /// the `Range` header, 0 when no `Range` is reported, or the file size
    /// when the upload already completed.
    ///
    /// # Errors
    /// - [`Error::UploadFailed`] if the session is gone or the reported
    ///   `Range` cannot be parsed
    pub async fn upload_status(&self, token: &str, session: &ResumableSession) -> Result<u64> {
        let request = HttpRequest::put(session.session_uri.clone())
            .bearer(token)
            .header("Content-Length", "0")
            .header("Content-Range", format!("bytes */{}", session.file_size));
        let response = self.send(request).await?;

        match response.status {
            200 | 201 => Ok(session.file_size),
            RESUME_INCOMPLETE => match response.header("Range") {
                None => Ok(0),
                Some(range) => match range_upper(range) {
                    Some(upper) => Ok(upper + 1),
                    None => Err(Error::UploadFailed {
                        status: response.status,
                        reason: format!("Unparseable Range header '{}'", range),
                        body: response.text(),
                    }),
                },
            },
            _ => Err(response.into_upload_failed()),
        }
    }
}
