//! Unified cloud storage for CloudFace.
//!
//! One [`CloudProvider`] trait covers Amazon S3, Dropbox and Google Drive.
//! [`StorageFacade`] holds the active provider and forwards every call to
//! it; [`ProviderRegistry`] builds providers by name from JSON config.
//!
//! # Design Principles
//! - Provider isolation: each adapter owns its credentials and wire protocol
//! - Sequential transfers: every chunk or part waits for the previous response
//! - No retries: failures surface immediately as typed errors
//! - Testable wire protocols: all HTTP goes through [`Transport`]

pub mod auth;
pub mod dropbox;
pub mod facade;
pub mod gdrive;
pub mod provider;
pub mod registry;
pub mod s3;
pub mod transport;
pub mod util;

pub use dropbox::{DropboxConfig, DropboxProvider};
pub use facade::StorageFacade;
pub use gdrive::{GDriveConfig, GDriveProvider, ResumableSession};
pub use provider::{CloudProvider, DownloadOptions, RemoteEntryMetadata, UploadOptions};
pub use registry::{create_default_registry, create_registry_with_transport, ProviderFactory, ProviderRegistry};
pub use s3::{AmazonS3Provider, S3Config};
pub use transport::{HttpRequest, HttpResponse, MockTransport, ReqwestTransport, Transport};
