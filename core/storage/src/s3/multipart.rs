//! Multipart upload bookkeeping: part planning and the XML bodies.

use serde::{Deserialize, Serialize};

use cloudface_common::{Error, Result};

/// One slice of the object to send as a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSlice {
    /// 1-based part number.
    pub part_number: u32,
    /// Byte offset of the slice in the object.
    pub offset: u64,
    pub len: u64,
}

/// Split an object of `size` bytes into consecutive parts of `part_size`
/// bytes; the last part carries the remainder.
pub fn plan_parts(size: u64, part_size: u64) -> Vec<PartSlice> {
    let part_size = part_size.max(1);
    let mut parts = Vec::new();
    let mut offset = 0;
    let mut part_number = 1;

    while offset < size {
        let len = part_size.min(size - offset);
        parts.push(PartSlice {
            part_number,
            offset,
            len,
        });
        offset += len;
        part_number += 1;
    }

    parts
}

/// A completed part: its number and the ETag S3 returned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartRecord {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// Body of the completion request.
#[derive(Debug, Default, Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
pub struct CompleteMultipartUpload {
    #[serde(rename = "Part")]
    parts: Vec<PartRecord>,
}

impl CompleteMultipartUpload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished part.
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] unless `part_number` directly follows the
    ///   last recorded part (starting at 1)
    pub fn record(&mut self, part_number: u32, etag: impl Into<String>) -> Result<()> {
        let expected = self.parts.len() as u32 + 1;
        if part_number != expected {
            return Err(Error::InvalidInput(format!(
                "Part {} recorded out of order, expected part {}",
                part_number, expected
            )));
        }
        self.parts.push(PartRecord {
            part_number,
            etag: etag.into(),
        });
        Ok(())
    }

    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    pub fn to_xml(&self) -> Result<String> {
        quick_xml::se::to_string(self)
            .map_err(|e| Error::Serialization(format!("Failed to build parts list: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateMultipartUploadResult {
    upload_id: String,
}

/// Extract `UploadId` from an `InitiateMultipartUploadResult` document.
pub fn parse_upload_id(xml: &str) -> Result<String> {
    let result: InitiateMultipartUploadResult = quick_xml::de::from_str(xml)
        .map_err(|e| Error::Serialization(format!("Invalid initiate response: {}", e)))?;

    if result.upload_id.is_empty() {
        return Err(Error::Serialization("Empty UploadId in initiate response".to_string()));
    }
    Ok(result.upload_id)
}
