//! Helpers shared by the providers: local file checks and URL encoding.

use std::path::Path;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use cloudface_common::{Error, RemotePath, Result};

/// Characters left unescaped in a URL path segment or query value.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a single path segment or query value.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Percent-encode every component of `path`, joined by '/', without a
/// leading separator.
pub fn encode_path(path: &RemotePath) -> String {
    path.components()
        .iter()
        .map(|component| encode_segment(component))
        .collect::<Vec<_>>()
        .join("/")
}

/// Size of a local regular file.
///
/// # Errors
/// - [`Error::FileNotFound`] if `file` is missing or not a regular file
pub async fn local_file_size(file: &Path) -> Result<u64> {
    match tokio::fs::metadata(file).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(file_not_found(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(file_not_found(file)),
        Err(e) => Err(e.into()),
    }
}

/// Final component of a local path, as UTF-8.
pub fn base_name(file: &Path) -> Result<String> {
    file.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidInput(format!("Invalid file name: {}", file.display())))
}

fn file_not_found(file: &Path) -> Error {
    Error::FileNotFound {
        path: file.display().to_string(),
    }
}
