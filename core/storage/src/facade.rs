//! Single entry point over the active provider.

use std::path::{Path, PathBuf};

use cloudface_common::{AuthParams, Error, Result};

use crate::provider::{CloudProvider, DownloadOptions, RemoteEntryMetadata, UploadOptions};

/// Holds one active provider and forwards every call to it unchanged.
///
/// All calls fail with [`Error::NoProviderConfigured`] until a provider is
/// installed with [`StorageFacade::set_provider`].
#[derive(Default)]
pub struct StorageFacade {
    provider: Option<Box<dyn CloudProvider>>,
}

impl StorageFacade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a facade with `provider` already installed.
    pub fn with_provider(provider: Box<dyn CloudProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Install `provider`, returning the one it replaces.
    pub fn set_provider(&mut self, provider: Box<dyn CloudProvider>) -> Option<Box<dyn CloudProvider>> {
        self.provider.replace(provider)
    }

    /// The active provider.
    pub fn provider(&self) -> Result<&dyn CloudProvider> {
        self.provider.as_deref().ok_or(Error::NoProviderConfigured)
    }

    fn provider_mut(&mut self) -> Result<&mut (dyn CloudProvider + 'static)> {
        self.provider.as_deref_mut().ok_or(Error::NoProviderConfigured)
    }

    pub async fn authorize(&mut self, params: &AuthParams) -> Result<()> {
        self.provider_mut()?.authorize(params).await
    }

    pub async fn upload(&self, file: &Path, path: &str, options: &UploadOptions) -> Result<()> {
        self.provider()?.upload(file, path, options).await
    }

    pub async fn download(&self, file: &str, path: &Path, options: &DownloadOptions) -> Result<PathBuf> {
        self.provider()?.download(file, path, options).await
    }

    pub async fn create_folder(&self, path: &str) -> Result<()> {
        self.provider()?.create_folder(path).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.provider()?.delete(path).await
    }

    pub async fn move_path(&self, from_path: &str, to_path: &str) -> Result<()> {
        self.provider()?.move_path(from_path, to_path).await
    }

    pub async fn copy_path(&self, from_path: &str, to_path: &str) -> Result<()> {
        self.provider()?.copy_path(from_path, to_path).await
    }

    pub async fn list_data(&self, path: &str) -> Result<RemoteEntryMetadata> {
        self.provider()?.list_data(path).await
    }
}
