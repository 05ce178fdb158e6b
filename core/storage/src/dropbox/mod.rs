//! Dropbox storage provider.
//!
//! Talks to the Dropbox core API (v1) with a bearer token. Files above the
//! single-request limit go through the chunked upload protocol, where
//! every chunk carries the upload id and offset returned for the previous
//! one.

pub mod chunked;
pub mod metadata;
pub mod provider;

pub use chunked::{ChunkAck, ChunkCursor, ChunkedUploader};
pub use metadata::{normalize, DropboxMetadata};
pub use provider::{DropboxConfig, DropboxProvider};
