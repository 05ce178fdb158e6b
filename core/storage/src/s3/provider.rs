//! Amazon S3 provider implementation.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use cloudface_common::{AuthParams, Error, RemotePath, Result};

use crate::provider::{CloudProvider, DownloadOptions, RemoteEntryMetadata, UploadOptions};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::util::{base_name, encode_path, encode_segment, local_file_size};

use super::multipart::{parse_upload_id, plan_parts, CompleteMultipartUpload};
use super::signer::{amz_date, Signer};

/// Largest object sent in a single PUT (100 MiB).
pub const FILE_LIMIT_SIZE: u64 = 104_857_600;
/// Size of each multipart part (64 MiB).
pub const PART_SIZE: u64 = 67_108_864;

/// Amazon S3 provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Region endpoint prefix, e.g. `s3-eu-west-1`.
    pub region: String,
    pub host: String,
    pub scheme: String,
    /// Objects larger than this use multipart upload.
    pub multipart_threshold: u64,
    pub part_size: u64,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "s3-eu-west-1".to_string(),
            host: "amazonaws.com".to_string(),
            scheme: "https".to_string(),
            multipart_threshold: FILE_LIMIT_SIZE,
            part_size: PART_SIZE,
        }
    }
}

/// Where an object lives: its virtual-hosted URL and signing resource.
struct ObjectTarget {
    url: String,
    resource: String,
}

impl ObjectTarget {
    fn with_query(&self, url_query: &str, resource_query: &str) -> Self {
        Self {
            url: format!("{}?{}", self.url, url_query),
            resource: format!("{}?{}", self.resource, resource_query),
        }
    }
}

/// Amazon S3 storage provider.
///
/// Only `upload` is backed by the S3 REST API; the remaining operations
/// report [`Error::NotYetImplemented`].
pub struct AmazonS3Provider {
    config: S3Config,
    transport: Arc<dyn Transport>,
    signer: Option<Signer>,
}

impl AmazonS3Provider {
    pub fn new(config: S3Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            signer: None,
        }
    }

    /// Create a provider with default configuration over HTTPS.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(S3Config::default(), Arc::new(ReqwestTransport::new()?)))
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    fn signer(&self) -> Result<&Signer> {
        self.signer.as_ref().ok_or_else(|| Error::NotAuthorized {
            provider: self.name().to_string(),
        })
    }

    /// Resolve `path` (`bucket[/prefix...]`) and the object name.
    fn target(&self, path: &str, object_name: &str, region: &str) -> Result<ObjectTarget> {
        let remote = RemotePath::parse(path);
        let (bucket, prefix) = remote
            .components()
            .split_first()
            .ok_or_else(|| Error::missing("bucket"))?;

        let key = RemotePath::from_components(prefix.to_vec())?.join(object_name)?;
        let encoded_key = encode_path(&key);

        Ok(ObjectTarget {
            url: format!(
                "{}://{}.{}.{}/{}",
                self.config.scheme, bucket, region, self.config.host, encoded_key
            ),
            resource: format!("/{}/{}", bucket, encoded_key),
        })
    }

    /// Sign and send one request against `target`.
    async fn send_signed(
        &self,
        method: Method,
        target: &ObjectTarget,
        content_type: &str,
        body: Bytes,
    ) -> Result<HttpResponse> {
        let signer = self.signer()?;
        let date = amz_date(Utc::now());
        let authorization = signer.authorization(method.as_str(), content_type, &date, &target.resource);

        let mut request = HttpRequest::new(method, target.url.clone())
            .header("Authorization", authorization)
            .header("x-amz-date", date);
        if !content_type.is_empty() {
            request = request.header("Content-Type", content_type);
        }
        if !body.is_empty() {
            request = request.header("Content-Length", body.len().to_string());
        }

        self.transport.send(request.body(body)).await
    }

    async fn upload_single(&self, file: &Path, target: &ObjectTarget, content_type: &str) -> Result<()> {
        let content = tokio::fs::read(file).await?;
        self.send_signed(Method::PUT, target, content_type, Bytes::from(content))
            .await?
            .require_upload_success()?;
        Ok(())
    }

    /// Initiate a multipart upload and return its upload id.
    async fn initiate_multipart(&self, target: &ObjectTarget) -> Result<String> {
        let response = self
            .send_signed(Method::POST, &target.with_query("uploads", "uploads"), "", Bytes::new())
            .await?
            .require_upload_success()?;

        parse_upload_id(&response.text())
    }

    /// Upload one part and return its ETag.
    async fn upload_part(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        part_number: u32,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<String> {
        let part_target = target.with_query(
            &format!("partNumber={}&uploadId={}", part_number, encode_segment(upload_id)),
            &format!("partNumber={}&uploadId={}", part_number, upload_id),
        );

        let response = self
            .send_signed(Method::PUT, &part_target, content_type, Bytes::from(data))
            .await?
            .require_upload_success()?;

        match response.header("ETag") {
            Some(etag) => Ok(etag.to_string()),
            None => Err(Error::UploadFailed {
                status: response.status,
                reason: format!("No ETag returned for part {}", part_number),
                body: response.text(),
            }),
        }
    }

    async fn complete_multipart(
        &self,
        target: &ObjectTarget,
        upload_id: &str,
        parts: &CompleteMultipartUpload,
    ) -> Result<()> {
        let complete_target = target.with_query(
            &format!("uploadId={}", encode_segment(upload_id)),
            &format!("uploadId={}", upload_id),
        );

        self.send_signed(
            Method::POST,
            &complete_target,
            "application/xml",
            Bytes::from(parts.to_xml()?),
        )
        .await?
        .require_upload_success()?;
        Ok(())
    }

    async fn upload_multipart(
        &self,
        file: &Path,
        size: u64,
        target: &ObjectTarget,
        content_type: &str,
    ) -> Result<()> {
        let upload_id = self.initiate_multipart(target).await?;
        info!("Initiated multipart upload {} for {}", upload_id, target.resource);

        let mut handle = File::open(file).await?;
        let mut parts = CompleteMultipartUpload::new();

        for slice in plan_parts(size, self.config.part_size) {
            let mut data = vec![0u8; slice.len as usize];
            handle.seek(SeekFrom::Start(slice.offset)).await?;
            handle.read_exact(&mut data).await?;

            let etag = match self
                .upload_part(target, &upload_id, slice.part_number, content_type, data)
                .await
            {
                Ok(etag) => etag,
                Err(e) => {
                    warn!(
                        "Part {} of upload {} failed, transfer must be restarted",
                        slice.part_number, upload_id
                    );
                    return Err(e);
                }
            };
            debug!("Uploaded part {} ({} bytes)", slice.part_number, slice.len);
            parts.record(slice.part_number, etag)?;
        }
        drop(handle);

        self.complete_multipart(target, &upload_id, &parts).await?;
        info!("Completed multipart upload {} with {} parts", upload_id, parts.parts().len());
        Ok(())
    }
}

#[async_trait]
impl CloudProvider for AmazonS3Provider {
    fn name(&self) -> &str {
        "amazon_s3"
    }

    async fn authorize(&mut self, params: &AuthParams) -> Result<()> {
        let access_key_id = params.require(AuthParams::ACCESS_KEY_ID)?;
        let secret_key = params.require(AuthParams::SECRET_KEY)?;

        self.signer = Some(Signer::new(access_key_id, secret_key));
        Ok(())
    }

    /// Upload into `bucket[/prefix...]`.
    ///
    /// # Preconditions
    /// - `path` names at least the bucket
    ///
    /// # Postconditions
    /// - Files up to `multipart_threshold` go in one signed PUT
    /// - Larger files are initiated, sent part by part in order, then
    ///   completed; nothing is aborted on failure
    async fn upload(&self, file: &Path, path: &str, options: &UploadOptions) -> Result<()> {
        let size = local_file_size(file).await?;
        self.signer()?;

        let region = options.region.as_deref().unwrap_or(&self.config.region);
        let target = self.target(path, &base_name(file)?, region)?;
        let content_type = options.content_type(file);

        if size <= self.config.multipart_threshold {
            debug!("Uploading {} ({} bytes) in a single request", target.resource, size);
            self.upload_single(file, &target, &content_type).await
        } else {
            self.upload_multipart(file, size, &target, &content_type).await
        }
    }

    async fn download(&self, _file: &str, _path: &Path, _options: &DownloadOptions) -> Result<PathBuf> {
        Err(Error::not_implemented("amazon_s3.download"))
    }

    async fn create_folder(&self, _path: &str) -> Result<()> {
        Err(Error::not_implemented("amazon_s3.create_folder"))
    }

    async fn delete(&self, _path: &str) -> Result<()> {
        Err(Error::not_implemented("amazon_s3.delete"))
    }

    async fn move_path(&self, _from_path: &str, _to_path: &str) -> Result<()> {
        Err(Error::not_implemented("amazon_s3.move_path"))
    }

    async fn copy_path(&self, _from_path: &str, _to_path: &str) -> Result<()> {
        Err(Error::not_implemented("amazon_s3.copy_path"))
    }

    async fn list_data(&self, _path: &str) -> Result<RemoteEntryMetadata> {
        Err(Error::not_implemented("amazon_s3.list_data"))
    }
}
