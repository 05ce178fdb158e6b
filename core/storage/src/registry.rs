//! Provider registry for dynamic provider resolution.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use cloudface_common::{Error, Result};

use crate::dropbox::{DropboxConfig, DropboxProvider};
use crate::gdrive::{GDriveConfig, GDriveProvider};
use crate::provider::CloudProvider;
use crate::s3::{AmazonS3Provider, S3Config};
use crate::transport::{ReqwestTransport, Transport};

/// Factory function type for creating providers.
pub type ProviderFactory = Box<dyn Fn(Value) -> Result<Box<dyn CloudProvider>> + Send + Sync>;

/// Registry for storage provider factories.
///
/// Resolved providers are fresh, unauthorized instances; each caller owns
/// its own credentials.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory.
    ///
    /// # Preconditions
    /// - `name` must be unique within the registry
    ///
    /// # Postconditions
    /// - Factory is registered and can be resolved by name
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if `name` is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::InvalidInput(format!(
                "Provider '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a provider by name and configuration.
    ///
    /// # Preconditions
    /// - Provider must be registered
    /// - `config` is `null` or an object the provider's config accepts
    ///
    /// # Postconditions
    /// - Returns a new provider that still needs `authorize`
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if the provider is unknown or the
    ///   configuration does not fit it
    pub fn resolve(&self, name: &str, config: Value) -> Result<Box<dyn CloudProvider>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::InvalidInput(format!("Provider '{}' is not registered", name)))?;
        factory(config)
    }

    /// Get list of registered provider names.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize a provider config; `null` selects the defaults.
fn parse_config<T: DeserializeOwned + Default>(provider: &str, config: Value) -> Result<T> {
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config)
        .map_err(|e| Error::InvalidInput(format!("Invalid {} config: {}", provider, e)))
}

fn transport_or_default(transport: &Option<Arc<dyn Transport>>) -> Result<Arc<dyn Transport>> {
    match transport {
        Some(transport) => Ok(transport.clone()),
        None => Ok(Arc::new(ReqwestTransport::new()?)),
    }
}

fn build_registry(transport: Option<Arc<dyn Transport>>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    let shared = transport.clone();
    let s3: ProviderFactory = Box::new(move |config| {
        let config: S3Config = parse_config("amazon_s3", config)?;
        Ok(Box::new(AmazonS3Provider::new(config, transport_or_default(&shared)?)))
    });

    let shared = transport.clone();
    let dropbox: ProviderFactory = Box::new(move |config| {
        let config: DropboxConfig = parse_config("dropbox", config)?;
        Ok(Box::new(DropboxProvider::new(config, transport_or_default(&shared)?)))
    });

    let gdrive: ProviderFactory = Box::new(move |config| {
        let config: GDriveConfig = parse_config("gdrive", config)?;
        Ok(Box::new(GDriveProvider::new(config, transport_or_default(&transport)?)))
    });

    registry.factories.insert("amazon_s3".to_string(), s3);
    registry.factories.insert("dropbox".to_string(), dropbox);
    registry.factories.insert("gdrive".to_string(), gdrive);

    registry
}

/// Create a registry with the built-in providers over HTTPS.
pub fn create_default_registry() -> ProviderRegistry {
    build_registry(None)
}

/// Create a registry whose providers all send through `transport`.
pub fn create_registry_with_transport(transport: Arc<dyn Transport>) -> ProviderRegistry {
    build_registry(Some(transport))
}
