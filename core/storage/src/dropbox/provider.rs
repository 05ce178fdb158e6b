//! Dropbox provider implementation (API v1).

use async_trait::async_trait;
use bytes::Bytes;
use oauth2::AccessToken;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use cloudface_common::{AuthParams, Error, RemotePath, Result};

use crate::auth::{bearer, exchange_token};
use crate::provider::{CloudProvider, DownloadOptions, RemoteEntryMetadata, UploadOptions};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::util::{base_name, encode_path, encode_segment, local_file_size};

use super::chunked::ChunkedUploader;
use super::metadata::{normalize, DropboxMetadata};

/// Largest file sent in a single PUT (150 MiB).
pub const FILE_LIMIT_SIZE: u64 = 157_286_400;
/// Size of each chunk of a chunked upload (64 MiB).
pub const CHUNK_SIZE: u64 = 67_108_864;

/// Dropbox provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropboxConfig {
    /// Base URL of the metadata and fileops API.
    pub api_base: String,
    /// Base URL of the file content API.
    pub content_base: String,
    /// Access root, `dropbox` or `sandbox`.
    pub root: String,
    pub token_url: String,
    /// Files larger than this use the chunked upload protocol.
    pub chunked_threshold: u64,
    pub chunk_size: u64,
}

impl Default for DropboxConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.dropbox.com/1".to_string(),
            content_base: "https://api-content.dropbox.com/1".to_string(),
            root: "dropbox".to_string(),
            token_url: "https://api.dropbox.com/1/oauth2/token".to_string(),
            chunked_threshold: FILE_LIMIT_SIZE,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Dropbox storage provider.
pub struct DropboxProvider {
    config: DropboxConfig,
    transport: Arc<dyn Transport>,
    access_token: Option<AccessToken>,
}

impl DropboxProvider {
    pub fn new(config: DropboxConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            access_token: None,
        }
    }

    /// Create a provider with default configuration over HTTPS.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(DropboxConfig::default(), Arc::new(ReqwestTransport::new()?)))
    }

    pub fn config(&self) -> &DropboxConfig {
        &self.config
    }

    /// Exchange an OAuth2 authorization code for an access token.
    ///
    /// This is a separate entry point from [`CloudProvider::authorize`],
    /// which only accepts a ready access token.
    ///
    /// # Postconditions
    /// - The exchanged token is stored and used by every later request
    ///
    /// # Errors
    /// - [`Error::MissingParameter`] if `client_id`, `client_secret` or
    ///   `authorization_code` is absent
    /// - [`Error::InvalidRequest`] if Dropbox rejects the code
    pub async fn authorize_with_code(&mut self, params: &AuthParams) -> Result<()> {
        let client_id = params.require(AuthParams::CLIENT_ID)?;
        let client_secret = params.require(AuthParams::CLIENT_SECRET)?;
        let code = params.require(AuthParams::AUTHORIZATION_CODE)?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];
        if let Some(redirect_uri) = params.get(AuthParams::REDIRECT_URI) {
            form.push(("redirect_uri", redirect_uri));
        }

        let token = exchange_token(self.transport.as_ref(), &self.config.token_url, &form).await?;
        self.access_token = Some(token);
        Ok(())
    }

    fn token(&self) -> Result<&str> {
        bearer(&self.access_token, "dropbox")
    }

    /// `{base}/{operation}/{root}/{encoded path}`
    fn endpoint(&self, base: &str, operation: &str, path: &RemotePath) -> String {
        format!("{}/{}/{}/{}", base, operation, self.config.root, encode_path(path))
    }

    fn api_url(&self, operation: &str, path: &str) -> String {
        self.endpoint(&self.config.api_base, operation, &RemotePath::parse(path))
    }

    fn content_url(&self, operation: &str, path: &RemotePath) -> String {
        self.endpoint(&self.config.content_base, operation, path)
    }

    /// Send with the bearer token, failing with `InvalidRequest` on non-2xx.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = request.bearer(self.token()?);
        self.transport.send(request).await?.require_success()
    }

    /// POST a form to `{api}/fileops/{operation}`.
    async fn fileop(&self, operation: &str, form: &[(&str, &str)]) -> Result<()> {
        let url = format!("{}/fileops/{}", self.config.api_base, operation);
        self.send(HttpRequest::post(url).form(form)).await?;
        debug!("Dropbox fileops/{} succeeded", operation);
        Ok(())
    }

    /// Extract a string field from a JSON response.
    fn json_field(response: &HttpResponse, field: &str) -> Result<String> {
        let value: serde_json::Value = response.json()?;
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Serialization(format!("Missing '{}' in response", field)))
    }

    /// Shareable link to a file or folder.
    pub async fn get_link(&self, path: &str) -> Result<String> {
        let response = self.send(HttpRequest::post(self.api_url("shares", path))).await?;
        Self::json_field(&response, "url")
    }

    /// Direct (streamable) link to a file.
    pub async fn get_media(&self, path: &str) -> Result<String> {
        let response = self.send(HttpRequest::post(self.api_url("media", path))).await?;
        Self::json_field(&response, "url")
    }

    /// Copy reference usable to copy the file into another account.
    pub async fn get_copy_reference(&self, path: &str) -> Result<String> {
        let response = self.send(HttpRequest::get(self.api_url("copy_ref", path))).await?;
        Self::json_field(&response, "copy_ref")
    }

    /// Thumbnail of an image file, e.g. `size = "m"`, `format = "jpeg"`.
    pub async fn get_thumbnail(&self, path: &str, size: &str, format: &str) -> Result<Bytes> {
        let url = format!(
            "{}?size={}&format={}",
            self.content_url("thumbnails", &RemotePath::parse(path)),
            encode_segment(size),
            encode_segment(format)
        );
        let response = self.send(HttpRequest::get(url)).await?;
        Ok(response.body)
    }

    async fn upload_single(&self, file: &Path, remote: &RemotePath, overwrite: bool) -> Result<()> {
        let content = tokio::fs::read(file).await?;
        let url = format!("{}?overwrite={}", self.content_url("files_put", remote), overwrite);
        let request = HttpRequest::put(url)
            .bearer(self.token()?)
            .header("Content-Type", "application/octet-stream")
            .header("Content-Length", content.len().to_string())
            .body(content);

        self.transport.send(request).await?.require_upload_success()?;
        Ok(())
    }

    async fn upload_chunked(&self, file: &Path, size: u64, remote: &RemotePath, overwrite: bool) -> Result<()> {
        let token = self.token()?;
        let uploader = ChunkedUploader::new(
            self.transport.as_ref(),
            format!("{}/chunked_upload", self.config.content_base),
            token,
            self.config.chunk_size,
        );

        let cursor = uploader.upload(file, size).await?;
        let upload_id = cursor.upload_id.ok_or_else(|| Error::UploadFailed {
            status: 0,
            reason: "No chunk was accepted".to_string(),
            body: String::new(),
        })?;

        let overwrite = overwrite.to_string();
        let request = HttpRequest::post(self.content_url("commit_chunked_upload", remote))
            .bearer(token)
            .form(&[("upload_id", upload_id.as_str()), ("overwrite", overwrite.as_str())]);
        self.transport.send(request).await?.require_upload_success()?;

        info!("Committed chunked upload {} ({} bytes)", upload_id, size);
        Ok(())
    }

    /// Write `content` to `target`, refusing to replace an existing file
    /// unless `overwrite` is set.
    async fn write_local(target: &Path, content: &[u8], overwrite: bool) -> Result<()> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut handle = match options.open(target).await {
            Ok(handle) => handle,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::FileAlreadyExists {
                    path: target.display().to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        handle.write_all(content).await?;
        handle.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl CloudProvider for DropboxProvider {
    fn name(&self) -> &str {
        "dropbox"
    }

    async fn authorize(&mut self, params: &AuthParams) -> Result<()> {
        let token = params.require(AuthParams::ACCESS_TOKEN)?;
        self.access_token = Some(AccessToken::new(token.to_string()));
        Ok(())
    }

    /// # Postconditions
    /// - Files up to `chunked_threshold` go in one `files_put`
    /// - Larger files are sent in chunks at the offset Dropbox reports,
    ///   then committed under `path`
    async fn upload(&self, file: &Path, path: &str, options: &UploadOptions) -> Result<()> {
        let size = local_file_size(file).await?;
        self.token()?;

        let remote = RemotePath::parse(path).join(&base_name(file)?)?;

        if size > self.config.chunked_threshold {
            debug!("Uploading {} ({} bytes) in chunks", remote, size);
            self.upload_chunked(file, size, &remote, options.overwrite).await
        } else {
            debug!("Uploading {} ({} bytes) in a single request", remote, size);
            self.upload_single(file, &remote, options.overwrite).await
        }
    }

    async fn download(&self, file: &str, path: &Path, options: &DownloadOptions) -> Result<PathBuf> {
        let directory = if path.as_os_str().is_empty() {
            options.default_path.clone().ok_or_else(|| Error::FolderNotFound {
                path: String::new(),
            })?
        } else {
            path.to_path_buf()
        };

        let is_dir = tokio::fs::metadata(&directory)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(Error::FolderNotFound {
                path: directory.display().to_string(),
            });
        }

        let remote = RemotePath::parse(file);
        let name = remote
            .name()
            .ok_or_else(|| Error::InvalidInput(format!("Not a file path: '{}'", file)))?
            .to_string();

        let response = self
            .send(HttpRequest::get(self.content_url("files", &remote)))
            .await?;

        let target = directory.join(name);
        Self::write_local(&target, &response.body, options.overwrite).await?;
        debug!("Downloaded {} to {}", remote, target.display());
        Ok(target)
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        let path = RemotePath::parse(path).to_string_path();
        self.fileop("create_folder", &[("root", self.config.root.as_str()), ("path", path.as_str())])
            .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let path = RemotePath::parse(path).to_string_path();
        self.fileop("delete", &[("root", self.config.root.as_str()), ("path", path.as_str())])
            .await
    }

    async fn move_path(&self, from_path: &str, to_path: &str) -> Result<()> {
        let from_path = RemotePath::parse(from_path).to_string_path();
        let to_path = RemotePath::parse(to_path).to_string_path();
        self.fileop(
            "move",
            &[
                ("root", self.config.root.as_str()),
                ("from_path", from_path.as_str()),
                ("to_path", to_path.as_str()),
            ],
        )
        .await
    }

    async fn copy_path(&self, from_path: &str, to_path: &str) -> Result<()> {
        let from_path = RemotePath::parse(from_path).to_string_path();
        let to_path = RemotePath::parse(to_path).to_string_path();
        self.fileop(
            "copy",
            &[
                ("root", self.config.root.as_str()),
                ("from_path", from_path.as_str()),
                ("to_path", to_path.as_str()),
            ],
        )
        .await
    }

    async fn list_data(&self, path: &str) -> Result<RemoteEntryMetadata> {
        let url = format!("{}?list=true", self.api_url("metadata", path));
        let response = self.send(HttpRequest::get(url)).await?;
        let raw: DropboxMetadata = response.json()?;
        Ok(normalize(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use reqwest::Method;

    fn small_config() -> DropboxConfig {
        DropboxConfig {
            chunked_threshold: 150,
            chunk_size: 64,
            ..Default::default()
        }
    }

    async fn authorized(config: DropboxConfig, mock: &MockTransport) -> DropboxProvider {
        let mut provider = DropboxProvider::new(config, Arc::new(mock.clone()));
        provider
            .authorize(&AuthParams::new().with(AuthParams::ACCESS_TOKEN, "token-123"))
            .await
            .unwrap();
        provider
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, len: usize) -> PathBuf {
        let path = dir.path().join(name);
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, data).unwrap();
        path
    }

    fn body(request: &HttpRequest) -> String {
        String::from_utf8(request.body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_authorize_requires_access_token() {
        let mut provider = DropboxProvider::new(DropboxConfig::default(), Arc::new(MockTransport::new()));

        // Code-exchange parameters are not accepted by the token entry point.
        let params = AuthParams::new()
            .with(AuthParams::CLIENT_ID, "id")
            .with(AuthParams::CLIENT_SECRET, "secret")
            .with(AuthParams::AUTHORIZATION_CODE, "code");
        match provider.authorize(&params).await {
            Err(Error::MissingParameter { name }) => assert_eq!(name, "access_token"),
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authorize_with_code() {
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({
            "access_token": "exchanged",
            "token_type": "bearer",
            "uid": "12345"
        })));
        mock.enqueue(MockTransport::response(200));
        let mut provider = DropboxProvider::new(DropboxConfig::default(), Arc::new(mock.clone()));

        let params = AuthParams::new()
            .with(AuthParams::CLIENT_ID, "app-key")
            .with(AuthParams::CLIENT_SECRET, "app-secret")
            .with(AuthParams::AUTHORIZATION_CODE, "the-code");
        provider.authorize_with_code(&params).await.unwrap();
        provider.delete("/old").await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].url, "https://api.dropbox.com/1/oauth2/token");
        assert_eq!(
            body(&requests[0]),
            "grant_type=authorization_code&code=the-code&client_id=app-key&client_secret=app-secret"
        );
        assert_eq!(requests[1].header_value("Authorization"), Some("Bearer exchanged"));
    }

    #[tokio::test]
    async fn test_authorize_with_code_rejected() {
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(400).with_body(r#"{"error":"invalid_grant"}"#));
        let mut provider = DropboxProvider::new(DropboxConfig::default(), Arc::new(mock.clone()));

        let params = AuthParams::new()
            .with(AuthParams::CLIENT_ID, "a")
            .with(AuthParams::CLIENT_SECRET, "b")
            .with(AuthParams::AUTHORIZATION_CODE, "c");
        let result = provider.authorize_with_code(&params).await;

        assert!(matches!(result, Err(Error::InvalidRequest { status: 400, .. })));
        assert!(matches!(provider.delete("x").await, Err(Error::NotAuthorized { .. })));
    }

    #[tokio::test]
    async fn test_single_upload() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "notes 1.txt", 150);
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({"path": "/Docs/notes 1.txt"})));
        let provider = authorized(small_config(), &mock).await;

        provider.upload(&file, "/Docs", &UploadOptions::default()).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(
            requests[0].url,
            "https://api-content.dropbox.com/1/files_put/dropbox/Docs/notes%201.txt?overwrite=false"
        );
        assert_eq!(requests[0].header_value("Authorization"), Some("Bearer token-123"));
        assert_eq!(requests[0].body.len(), 150);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let mock = MockTransport::new();
        let provider = authorized(small_config(), &mock).await;

        let result = provider
            .upload(Path::new("/nonexistent/file.bin"), "/", &UploadOptions::default())
            .await;

        assert!(matches!(result, Err(Error::FileNotFound { .. })));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_chunked_upload_threads_id_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        // 200 bytes with 64-byte chunks: 64 + 64 + 64 + 8.
        let file = write_file(&dir, "big.bin", 200);
        let mock = MockTransport::new();
        for offset in [64, 128, 192, 200] {
            mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({
                "upload_id": "session-1",
                "offset": offset,
                "expires": "Tue, 19 Jul 2011 21:55:38 +0000"
            })));
        }
        mock.enqueue(MockTransport::response(200));
        let provider = authorized(small_config(), &mock).await;

        let options = UploadOptions {
            overwrite: true,
            ..Default::default()
        };
        provider.upload(&file, "Backups", &options).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[0].url, "https://api-content.dropbox.com/1/chunked_upload");
        assert_eq!(
            requests[1].url,
            "https://api-content.dropbox.com/1/chunked_upload?upload_id=session-1&offset=64"
        );
        assert_eq!(
            requests[3].url,
            "https://api-content.dropbox.com/1/chunked_upload?upload_id=session-1&offset=192"
        );
        let lens: Vec<usize> = requests[..4].iter().map(|r| r.body.len()).collect();
        assert_eq!(lens, vec![64, 64, 64, 8]);
        assert_eq!(requests[2].body[0], (128 % 251) as u8);

        let commit = &requests[4];
        assert_eq!(commit.method, Method::POST);
        assert_eq!(
            commit.url,
            "https://api-content.dropbox.com/1/commit_chunked_upload/dropbox/Backups/big.bin"
        );
        assert_eq!(body(commit), "upload_id=session-1&overwrite=true");
    }

    #[tokio::test]
    async fn test_chunked_upload_follows_server_offset() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "big.bin", 160);
        let mock = MockTransport::new();
        // The server only keeps 40 of the first 64 bytes.
        for offset in [40, 104, 160] {
            mock.enqueue(
                MockTransport::response(200)
                    .with_json(serde_json::json!({"upload_id": "s", "offset": offset})),
            );
        }
        mock.enqueue(MockTransport::response(200));
        let provider = authorized(small_config(), &mock).await;

        provider.upload(&file, "", &UploadOptions::default()).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1].body.len(), 64);
        assert_eq!(requests[1].body[0], 40);
        assert_eq!(requests[2].body.len(), 56);
        assert_eq!(body(&requests[3]), "upload_id=s&overwrite=false");
    }

    #[tokio::test]
    async fn test_chunked_upload_stalled_offset() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "big.bin", 160);
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({"upload_id": "s", "offset": 64})));
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({"upload_id": "s", "offset": 64})));
        let provider = authorized(small_config(), &mock).await;

        let result = provider.upload(&file, "", &UploadOptions::default()).await;

        assert!(matches!(result, Err(Error::UploadFailed { status: 200, .. })));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_chunk_failure_skips_commit() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "big.bin", 200);
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({"upload_id": "s", "offset": 64})));
        mock.enqueue(MockTransport::response(507).with_body("Insufficient Storage"));
        let provider = authorized(small_config(), &mock).await;

        match provider.upload(&file, "", &UploadOptions::default()).await {
            Err(Error::UploadFailed { status, body, .. }) => {
                assert_eq!(status, 507);
                assert_eq!(body, "Insufficient Storage");
            }
            other => panic!("expected UploadFailed, got {:?}", other),
        }
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_download_writes_basename() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_body("file content"));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        let written = provider
            .download("/Docs/report.pdf", dir.path(), &DownloadOptions::default())
            .await
            .unwrap();

        assert_eq!(written, dir.path().join("report.pdf"));
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "file content");
        assert_eq!(
            mock.requests()[0].url,
            "https://api-content.dropbox.com/1/files/dropbox/Docs/report.pdf"
        );
    }

    #[tokio::test]
    async fn test_download_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_body("x"));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        let options = DownloadOptions {
            default_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let written = provider.download("a.txt", Path::new(""), &options).await.unwrap();
        assert_eq!(written, dir.path().join("a.txt"));

        let result = provider
            .download("a.txt", Path::new(""), &DownloadOptions::default())
            .await;
        assert!(matches!(result, Err(Error::FolderNotFound { .. })));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_download_missing_directory() {
        let mock = MockTransport::new();
        let provider = authorized(DropboxConfig::default(), &mock).await;

        let result = provider
            .download("a.txt", Path::new("/nonexistent/dir"), &DownloadOptions::default())
            .await;

        assert!(matches!(result, Err(Error::FolderNotFound { .. })));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_download_without_overwrite_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("report.pdf");
        std::fs::write(&existing, "original").unwrap();
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_body("new content"));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        let options = DownloadOptions {
            overwrite: false,
            ..Default::default()
        };
        let result = provider.download("/report.pdf", dir.path(), &options).await;

        assert!(matches!(result, Err(Error::FileAlreadyExists { .. })));
        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_download_overwrites_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("report.pdf");
        std::fs::write(&existing, "original content that is longer").unwrap();
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_body("new"));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        provider
            .download("/report.pdf", dir.path(), &DownloadOptions::default())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&existing).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_download_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(404).with_body(r#"{"error": "File not found"}"#));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        let result = provider
            .download("/missing.txt", dir.path(), &DownloadOptions::default())
            .await;

        assert!(matches!(result, Err(Error::InvalidRequest { status: 404, .. })));
        assert!(!dir.path().join("missing.txt").exists());
    }

    #[tokio::test]
    async fn test_fileops_forms() {
        let mock = MockTransport::new();
        mock.set_responder(|_| MockTransport::response(200).with_body("{}"));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        provider.create_folder("Test").await.unwrap();
        provider.delete("/Test/old.txt").await.unwrap();
        provider.move_path("/a.txt", "/Archive/a.txt").await.unwrap();
        provider.copy_path("/b.txt", "/b copy.txt").await.unwrap();

        let requests = mock.requests();
        let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.dropbox.com/1/fileops/create_folder",
                "https://api.dropbox.com/1/fileops/delete",
                "https://api.dropbox.com/1/fileops/move",
                "https://api.dropbox.com/1/fileops/copy",
            ]
        );
        assert!(requests.iter().all(|r| r.method == Method::POST));
        assert_eq!(body(&requests[0]), "root=dropbox&path=%2FTest");
        assert_eq!(body(&requests[1]), "root=dropbox&path=%2FTest%2Fold.txt");
        assert_eq!(body(&requests[2]), "root=dropbox&from_path=%2Fa.txt&to_path=%2FArchive%2Fa.txt");
        assert_eq!(body(&requests[3]), "root=dropbox&from_path=%2Fb.txt&to_path=%2Fb+copy.txt");
    }

    #[tokio::test]
    async fn test_fileop_conflict() {
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(403).with_body(r#"{"error": "already exists"}"#));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        match provider.create_folder("/Test").await {
            Err(Error::InvalidRequest { status, reason, body }) => {
                assert_eq!(status, 403);
                assert_eq!(reason, "Forbidden");
                assert!(body.contains("already exists"));
            }
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_data() {
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({
            "hash": "abc",
            "bytes": 0,
            "path": "/Photos",
            "is_dir": true,
            "icon": "folder",
            "contents": [
                {"rev": "1f", "bytes": 10, "path": "/Photos/a.jpg", "is_dir": false}
            ]
        })));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        let entry = provider.list_data("/Photos").await.unwrap();

        assert_eq!(
            mock.requests()[0].url,
            "https://api.dropbox.com/1/metadata/dropbox/Photos?list=true"
        );
        assert!(entry.is_dir);
        assert_eq!(entry.revision.as_deref(), Some("abc"));
        assert_eq!(entry.items.unwrap()[0].path, "/Photos/a.jpg");
    }

    #[tokio::test]
    async fn test_helpers() {
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({
            "url": "https://db.tt/APqhX1",
            "expires": "Tue, 01 Jan 2030 00:00:00 +0000"
        })));
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({
            "url": "https://dl.dropboxusercontent.com/1/view/abc/a.mp4"
        })));
        mock.enqueue(MockTransport::response(200).with_json(serde_json::json!({
            "copy_ref": "z1X6ATl6aWtzOGq0c3g5Ng",
            "expires": "Fri, 31 Jan 2042 21:01:05 +0000"
        })));
        mock.enqueue(MockTransport::response(200).with_body(vec![0xff, 0xd8, 0xff]));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        assert_eq!(provider.get_link("/a.mp4").await.unwrap(), "https://db.tt/APqhX1");
        assert!(provider.get_media("/a.mp4").await.unwrap().ends_with("a.mp4"));
        assert_eq!(
            provider.get_copy_reference("/a.mp4").await.unwrap(),
            "z1X6ATl6aWtzOGq0c3g5Ng"
        );
        let thumbnail = provider.get_thumbnail("/pic.jpg", "m", "jpeg").await.unwrap();
        assert_eq!(&thumbnail[..], &[0xff, 0xd8, 0xff]);

        let requests = mock.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url, "https://api.dropbox.com/1/shares/dropbox/a.mp4");
        assert_eq!(requests[1].url, "https://api.dropbox.com/1/media/dropbox/a.mp4");
        assert_eq!(requests[2].method, Method::GET);
        assert_eq!(requests[2].url, "https://api.dropbox.com/1/copy_ref/dropbox/a.mp4");
        assert_eq!(
            requests[3].url,
            "https://api-content.dropbox.com/1/thumbnails/dropbox/pic.jpg?size=m&format=jpeg"
        );
    }

    #[tokio::test]
    async fn test_helper_failure() {
        let mock = MockTransport::new();
        mock.enqueue(MockTransport::response(404));
        let provider = authorized(DropboxConfig::default(), &mock).await;

        assert!(matches!(
            provider.get_link("/missing").await,
            Err(Error::InvalidRequest { status: 404, .. })
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: DropboxConfig = serde_json::from_value(serde_json::json!({"root": "sandbox"})).unwrap();
        assert_eq!(config.root, "sandbox");
        assert_eq!(config.chunked_threshold, 157_286_400);
        assert_eq!(config.chunk_size, 67_108_864);
        assert_eq!(config.content_base, "https://api-content.dropbox.com/1");
    }
}
