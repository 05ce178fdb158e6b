//! Common utilities and types shared across the CloudFace crates.
//!
//! This crate holds the error taxonomy every provider reports through and
//! the small value types (credentials, remote paths) that cross the
//! facade boundary unchanged.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{AuthParams, RemotePath, SensitiveString};
