//! Google Drive storage provider implementation.

use async_trait::async_trait;
use oauth2::AccessToken;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use cloudface_common::{AuthParams, Error, RemotePath, Result};

use crate::auth::{bearer, exchange_token};
use crate::provider::{CloudProvider, DownloadOptions, RemoteEntryMetadata, UploadOptions};
use crate::transport::{ReqwestTransport, Transport};
use crate::util::{base_name, local_file_size};

use super::client::{folder_query, About, DriveClient, DriveFile, ResumableSession};

/// Google Drive provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GDriveConfig {
    pub api_base: String,
    pub upload_base: String,
    pub token_url: String,
}

impl Default for GDriveConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v2".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v2".to_string(),
            token_url: "https://accounts.google.com/o/oauth2/token".to_string(),
        }
    }
}

/// Google Drive storage provider.
///
/// Uploads go through a resumable session. Only `upload` is backed by the
/// Drive API; the remaining unified operations report
/// [`Error::NotYetImplemented`].
pub struct GDriveProvider {
    config: GDriveConfig,
    client: DriveClient,
    access_token: Option<AccessToken>,
}

impl GDriveProvider {
    pub fn new(config: GDriveConfig, transport: Arc<dyn Transport>) -> Self {
        let client = DriveClient::new(transport, config.api_base.clone(), config.upload_base.clone());
        Self {
            config,
            client,
            access_token: None,
        }
    }

    /// Create a provider with default configuration over HTTPS.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(GDriveConfig::default(), Arc::new(ReqwestTransport::new()?)))
    }

    pub fn config(&self) -> &GDriveConfig {
        &self.config
    }

    fn token(&self) -> Result<&str> {
        bearer(&self.access_token, "gdrive")
    }

    /// Account information; `root_folder_id` anchors folder resolution.
    pub async fn account_info(&self) -> Result<About> {
        self.client.about(self.token()?).await
    }

    /// Run a Drive search query, e.g. one built with [`folder_query`].
    pub async fn find_folders(&self, query: &str) -> Result<Vec<DriveFile>> {
        self.client.find_files(self.token()?, query).await
    }

    /// Resolve a folder path to its Drive id, one lookup per segment.
    ///
    /// # Errors
    /// - [`Error::FolderNotFound`] for the first segment with no match;
    ///   no further lookups are made
    async fn resolve_folder(&self, path: &RemotePath) -> Result<String> {
        let mut current_id = self.account_info().await?.root_folder_id;
        let mut resolved = RemotePath::root();

        for component in path.components() {
            resolved = resolved.join(component)?;
            let folder = self
                .find_folders(&folder_query(component, &current_id))
                .await?
                .into_iter()
                .find(DriveFile::is_folder)
                .ok_or_else(|| Error::FolderNotFound {
                    path: resolved.to_string_path(),
                })?;
            current_id = folder.id;
        }

        debug!("Resolved folder {} to {}", path, current_id);
        Ok(current_id)
    }

    /// Create a resumable upload session for `file` in the folder `path`.
    ///
    /// # Preconditions
    /// - Provider is authorized
    /// - Every segment of `path` names an existing Drive folder
    ///
    /// # Postconditions
    /// - Returns a session no bytes have been sent to yet
    ///
    /// # Errors
    /// - [`Error::FileNotFound`] if `file` is missing
    /// - [`Error::FolderNotFound`] for the first unresolvable segment
    /// - [`Error::UploadFailed`] if Drive refuses the session
    pub async fn start_resumable_upload(
        &self,
        file: &Path,
        path: &str,
        options: &UploadOptions,
    ) -> Result<ResumableSession> {
        local_file_size(file).await?;
        let token = self.token()?;

        let parent_id = self.resolve_folder(&RemotePath::parse(path)).await?;
        self.client
            .start_resumable_upload(token, file, &base_name(file)?, &parent_id, &options.content_type(file))
            .await
    }

    /// Continue an interrupted upload from the last byte Drive stored.
    ///
    /// # Preconditions
    /// - The local file still has the size recorded in `session`
    ///
    /// # Postconditions
    /// - A session Drive reports as complete is left alone
    /// - Otherwise only the bytes past the stored range are sent
    ///
    /// # Errors
    /// - [`Error::UploadFailed`] if the session expired, the reported
    ///   `Range` is unreadable, or the final transfer fails
    pub async fn resume_interrupted_upload(&self, session: &ResumableSession) -> Result<()> {
        let token = self.token()?;
        let offset = self.client.upload_status(token, session).await?;

        if offset >= session.file_size {
            info!("Resumable upload already complete ({} bytes)", session.file_size);
            return Ok(());
        }

        info!("Resuming upload at byte {} of {}", offset, session.file_size);
        self.send_session(token, session, offset).await
    }

    async fn send_session(&self, token: &str, session: &ResumableSession, offset: u64) -> Result<()> {
        let result = self.client.send_from(token, session, offset).await;
        if result.is_err() {
            warn!(
                "Upload of {} interrupted, resumable session: {}",
                session.file.display(),
                session.session_uri
            );
        }
        result
    }
}

#[async_trait]
impl CloudProvider for GDriveProvider {
    fn name(&self) -> &str {
        "gdrive"
    }

    /// Exchange a refresh token, or else an authorization code, for an
    /// access token.
    async fn authorize(&mut self, params: &AuthParams) -> Result<()> {
        let client_id = params.require(AuthParams::CLIENT_ID)?;
        let client_secret = params.require(AuthParams::CLIENT_SECRET)?;

        let mut form = vec![("client_id", client_id), ("client_secret", client_secret)];
        if let Some(refresh_token) = params.get(AuthParams::REFRESH_TOKEN) {
            form.insert(0, ("grant_type", "refresh_token"));
            form.push(("refresh_token", refresh_token));
        } else if let Some(code) = params.get(AuthParams::AUTHORIZATION_CODE) {
            form.insert(0, ("grant_type", "authorization_code"));
            form.push(("code", code));
            if let Some(redirect_uri) = params.get(AuthParams::REDIRECT_URI) {
                form.push(("redirect_uri", redirect_uri));
            }
        } else {
            return Err(Error::missing(AuthParams::REFRESH_TOKEN));
        }

        let token = exchange_token(self.client.transport(), &self.config.token_url, &form).await?;
        self.access_token = Some(token);
        Ok(())
    }

    async fn upload(&self, file: &Path, path: &str, options: &UploadOptions) -> Result<()> {
        let session = self.start_resumable_upload(file, path, options).await?;
        self.send_session(self.token()?, &session, 0).await?;
        info!("Uploaded {} ({} bytes)", session.file.display(), session.file_size);
        Ok(())
    }

    async fn download(&self, _file: &str, _path: &Path, _options: &DownloadOptions) -> Result<PathBuf> {
        Err(Error::not_implemented("gdrive.download"))
    }

    async fn create_folder(&self, _path: &str) -> Result<()> {
        Err(Error::not_implemented("gdrive.create_folder"))
    }

    async fn delete(&self, _path: &str) -> Result<()> {
        Err(Error::not_implemented("gdrive.delete"))
    }

    async fn move_path(&self, _from_path: &str, _to_path: &str) -> Result<()> {
        Err(Error::not_implemented("gdrive.move_path"))
    }

    async fn copy_path(&self, _from_path: &str, _to_path: &str) -> Result<()> {
        Err(Error::not_implemented("gdrive.copy_path"))
    }

    async fn list_data(&self, _path: &str) -> Result<RemoteEntryMetadata> {
        Err(Error::not_implemented("gdrive.list_data"))
    }
}
