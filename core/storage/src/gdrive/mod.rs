//! Google Drive storage provider.
//!
//! Uses the Drive v2 API with an OAuth2 bearer token obtained from a
//! refresh token or an authorization code. Uploads are resumable: the
//! destination folder is resolved segment by segment from the account
//! root, a session is opened, and the file is sent to the session URI.

pub mod client;
pub mod provider;

pub use client::{folder_query, About, DriveClient, DriveFile, ResumableSession};
pub use provider::{GDriveConfig, GDriveProvider};
