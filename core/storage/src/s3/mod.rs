//! Amazon S3 storage provider for CloudFace.
//!
//! This module provides:
//! - AWS signature version 2 request signing (HMAC-SHA1)
//! - Single-request uploads for objects up to 100 MiB
//! - Multipart uploads in 64 MiB parts above that

pub mod multipart;
pub mod provider;
pub mod signer;

pub use multipart::{plan_parts, CompleteMultipartUpload, PartRecord, PartSlice};
pub use provider::{AmazonS3Provider, S3Config};
pub use signer::Signer;
