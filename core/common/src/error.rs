//! Common error types for CloudFace.

use thiserror::Error;

/// Top-level error type for CloudFace operations.
///
/// Remote protocol failures carry the HTTP status, reason phrase and body
/// verbatim so callers can diagnose provider-side problems.
#[derive(Debug, Error)]
pub enum Error {
    /// A required authorization or request parameter was not supplied.
    #[error("{name}-parameter is missing")]
    MissingParameter { name: String },

    /// A local file does not exist.
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// A local or remote folder does not exist.
    #[error("Folder not found: {path}")]
    FolderNotFound { path: String },

    /// The destination resource exists already.
    #[error("{path}-resource exists already")]
    ResourceAlreadyExists { path: String },

    /// The destination file exists already and overwriting was not allowed.
    #[error("{path}-file exists already")]
    FileAlreadyExists { path: String },

    /// The provider answered a request with a non-success status.
    #[error("Invalid request. Status code: {status}, Reason: {reason}, Content: {body}")]
    InvalidRequest {
        status: u16,
        reason: String,
        body: String,
    },

    /// An upload request was answered with a non-success status.
    #[error("Upload failed. Status code: {status}, Reason: {reason}, Content: {body}")]
    UploadFailed {
        status: u16,
        reason: String,
        body: String,
    },

    /// The provider does not implement this operation.
    #[error("This function is not implemented yet: {operation}")]
    NotYetImplemented { operation: String },

    /// The facade was used before a provider was installed.
    #[error("No cloud provider configured")]
    NoProviderConfigured,

    /// A request was attempted before `authorize` succeeded.
    #[error("Provider '{provider}' is not authorized")]
    NotAuthorized { provider: String },

    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Shorthand for [`Error::MissingParameter`].
    pub fn missing(name: impl Into<String>) -> Self {
        Error::MissingParameter { name: name.into() }
    }

    /// Shorthand for [`Error::NotYetImplemented`].
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Error::NotYetImplemented {
            operation: operation.into(),
        }
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
