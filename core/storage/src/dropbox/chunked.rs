//! Dropbox chunked upload protocol.
//!
//! Chunks are sent strictly in sequence: the server answers every chunk
//! with the upload id and the number of bytes it has accepted so far, and
//! both values go into the next request.

use serde::Deserialize;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use cloudface_common::{Error, Result};

use crate::transport::{HttpRequest, Transport};
use crate::util::encode_segment;

/// Progress of a chunked upload as acknowledged by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkCursor {
    /// `None` until the first chunk has been accepted.
    pub upload_id: Option<String>,
    /// Bytes the server has acknowledged.
    pub offset: u64,
}

impl ChunkCursor {
    pub fn start() -> Self {
        Self::default()
    }

    /// Query string for the next chunk request; empty for the first chunk.
    pub fn query(&self) -> String {
        match &self.upload_id {
            Some(upload_id) if self.offset != 0 => format!(
                "?upload_id={}&offset={}",
                encode_segment(upload_id),
                self.offset
            ),
            _ => String::new(),
        }
    }

    /// Cursor after the server acknowledged a chunk.
    pub fn advance(&self, ack: ChunkAck) -> Self {
        Self {
            upload_id: Some(ack.upload_id),
            offset: ack.offset,
        }
    }
}

/// Server response to a chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkAck {
    pub upload_id: String,
    pub offset: u64,
    #[serde(default)]
    pub expires: Option<String>,
}

/// Sends a local file to the chunked upload endpoint.
pub struct ChunkedUploader<'a> {
    transport: &'a dyn Transport,
    endpoint: String,
    token: &'a str,
    chunk_size: u64,
}

impl<'a> ChunkedUploader<'a> {
    pub fn new(transport: &'a dyn Transport, endpoint: String, token: &'a str, chunk_size: u64) -> Self {
        Self {
            transport,
            endpoint,
            token,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Upload `size` bytes of `file` and return the final cursor.
    ///
    /// The read position always follows the server-acknowledged offset.
    ///
    /// # Errors
    /// - [`Error::UploadFailed`] on a non-success response, or if the
    ///   server offset does not advance within the file
    pub async fn upload(&self, file: &Path, size: u64) -> Result<ChunkCursor> {
        let mut handle = File::open(file).await?;
        let mut cursor = ChunkCursor::start();

        while cursor.offset < size {
            let len = self.chunk_size.min(size - cursor.offset);
            let mut chunk = vec![0u8; len as usize];
            handle.seek(SeekFrom::Start(cursor.offset)).await?;
            handle.read_exact(&mut chunk).await?;

            let request = HttpRequest::put(format!("{}{}", self.endpoint, cursor.query()))
                .bearer(self.token)
                .header("Content-Type", "application/octet-stream")
                .body(chunk);
            let response = self.transport.send(request).await?.require_upload_success()?;
            let ack: ChunkAck = response.json()?;

            if ack.offset <= cursor.offset || ack.offset > size {
                return Err(Error::UploadFailed {
                    status: response.status,
                    reason: format!(
                        "Server offset {} does not advance from {} (file size {})",
                        ack.offset, cursor.offset, size
                    ),
                    body: response.text(),
                });
            }

            cursor = cursor.advance(ack);
            debug!("Chunk accepted, {} of {} bytes uploaded", cursor.offset, size);
        }

        Ok(cursor)
    }
}
