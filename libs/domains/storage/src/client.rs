use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};

/// Object keys are content-addressed (same key implies same bytes), so
/// everything uploaded is safe to cache forever.
const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// S3 rejects multipart parts below 5 MiB (except the final part).
const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Intent of a presigned URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    Get,
    Put,
}

/// Object storage operations for rendered creative assets.
///
/// Uploads are idempotent for a fixed `(bucket, key)`: the same key always
/// maps to the same bytes, so re-uploading is safe. Callers should check
/// `exists` first to avoid redundant transfer, but correctness does not
/// depend on it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file, returning the public URL of the object.
    ///
    /// Fails with `StorageError::NotFound` (non-retryable) when `local_path`
    /// does not exist, `StorageError::Transient` (retryable) on any
    /// network/service failure.
    async fn upload<'a>(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        content_type: Option<&'a str>,
        metadata: Option<HashMap<String, String>>,
    ) -> StorageResult<String>;

    /// Download an object to a local file, returning bytes written.
    async fn download(&self, bucket: &str, key: &str, destination: &Path) -> StorageResult<u64>;

    /// Whether the object exists. `Ok(false)` strictly means "object absent";
    /// any other failure raises.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Generate a time-limited URL for the given intent.
    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
        method: PresignMethod,
    ) -> StorageResult<String>;

    /// Public URL of an object. Pure, no I/O; assumes a public-read bucket policy.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Configured default lifetime for presigned URLs.
    fn default_presign_ttl(&self) -> Duration;
}

/// S3-compatible object store client (AWS S3, MinIO, or any S3 API endpoint).
///
/// The inner SDK client pools connections and is cheap to clone; one
/// `S3ObjectStore` is constructed at process bootstrap and shared across
/// activity invocations.
pub struct S3ObjectStore {
    client: Client,
    config: StorageConfig,
}

impl S3ObjectStore {
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            // MinIO and most self-hosted S3 endpoints require path-style addressing
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            config,
        }
    }

    /// Multipart upload for files at or above the configured threshold.
    /// Parts are uploaded with bounded concurrency; on any part failure the
    /// whole upload is aborted so the store does not accumulate orphaned parts.
    async fn upload_multipart(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        size_bytes: u64,
        content_type: Option<&str>,
        metadata: Option<HashMap<String, String>>,
    ) -> StorageResult<()> {
        let part_size = self.config.multipart_threshold_bytes.max(MIN_PART_SIZE);
        let parts = plan_parts(size_bytes, part_size);

        let create = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .cache_control(CACHE_CONTROL)
            .content_type(content_type.unwrap_or("application/octet-stream"))
            .set_metadata(metadata)
            .send()
            .await
            .map_err(|e| {
                StorageError::Transient(format!("create_multipart_upload failed: {}", e))
            })?;

        let upload_id = create
            .upload_id()
            .ok_or_else(|| StorageError::Internal("Multipart upload id missing".to_string()))?
            .to_string();

        debug!(
            bucket,
            key,
            parts = parts.len(),
            part_size,
            "Starting multipart upload"
        );

        match self
            .upload_parts(local_path, bucket, key, &upload_id, parts)
            .await
        {
            Ok(completed_parts) => {
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build();

                self.client
                    .complete_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(completed)
                    .send()
                    .await
                    .map_err(|e| {
                        StorageError::Transient(format!("complete_multipart_upload failed: {}", e))
                    })?;

                Ok(())
            }
            Err(err) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(bucket, key, error = %abort_err, "Failed to abort multipart upload");
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<PartSpec>,
    ) -> StorageResult<Vec<CompletedPart>> {
        let concurrency = self.config.effective_multipart_concurrency();
        let mut pending = parts.into_iter();
        let mut join_set: JoinSet<StorageResult<CompletedPart>> = JoinSet::new();
        let mut completed = Vec::new();

        loop {
            while join_set.len() < concurrency {
                let Some(spec) = pending.next() else { break };
                let client = self.client.clone();
                let path = local_path.to_path_buf();
                let bucket = bucket.to_string();
                let key = key.to_string();
                let upload_id = upload_id.to_string();
                join_set.spawn(async move {
                    upload_one_part(client, path, bucket, key, upload_id, spec).await
                });
            }

            match join_set.join_next().await {
                Some(joined) => {
                    let part = joined.map_err(|e| {
                        StorageError::Internal(format!("Part upload task panicked: {}", e))
                    })??;
                    completed.push(part);
                }
                None => break,
            }
        }

        // complete_multipart_upload requires parts in ascending order
        completed.sort_by_key(|p| p.part_number().unwrap_or(0));
        Ok(completed)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload<'a>(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        content_type: Option<&'a str>,
        metadata: Option<HashMap<String, String>>,
    ) -> StorageResult<String> {
        let file_meta = tokio::fs::metadata(local_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("Local file not found: {}", local_path.display()))
            } else {
                StorageError::Internal(format!("Failed to stat {}: {}", local_path.display(), e))
            }
        })?;
        let size_bytes = file_meta.len();

        if size_bytes >= self.config.multipart_threshold_bytes {
            self.upload_multipart(local_path, bucket, key, size_bytes, content_type, metadata)
                .await?;
        } else {
            let body = ByteStream::from_path(local_path).await.map_err(|e| {
                StorageError::Internal(format!("Failed to read {}: {}", local_path.display(), e))
            })?;

            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .cache_control(CACHE_CONTROL)
                .content_type(content_type.unwrap_or("application/octet-stream"))
                .set_metadata(metadata)
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    StorageError::Transient(format!(
                        "put_object failed for {}/{}: {}",
                        bucket, key, e
                    ))
                })?;
        }

        info!(bucket, key, size_bytes, "Uploaded object");
        Ok(self.public_url(bucket, key))
    }

    async fn download(&self, bucket: &str, key: &str, destination: &Path) -> StorageResult<u64> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_no_such_key() => {
                return Err(StorageError::NotFound(format!(
                    "Object {}/{} not found",
                    bucket, key
                )));
            }
            Err(e) => {
                return Err(StorageError::Transient(format!(
                    "get_object failed for {}/{}: {}",
                    bucket, key, e
                )));
            }
        };

        let mut body = output.body;
        let mut file = tokio::fs::File::create(destination).await?;
        let mut bytes_written: u64 = 0;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::Transient(format!("Object stream read failed: {}", e)))?
        {
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(bucket, key, bytes_written, "Downloaded object");
        Ok(bytes_written)
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_not_found() => {
                Ok(false)
            }
            Err(e) => Err(StorageError::Transient(format!(
                "head_object failed for {}/{}: {}",
                bucket, key, e
            ))),
        }
    }

    async fn presign(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
        method: PresignMethod,
    ) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| StorageError::Config(format!("Invalid presign TTL: {}", e)))?;

        let presigned = match method {
            PresignMethod::Get => self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presign_config)
                .await
                .map_err(|e| StorageError::Transient(format!("presign GET failed: {}", e)))?,
            PresignMethod::Put => self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .presigned(presign_config)
                .await
                .map_err(|e| StorageError::Transient(format!("presign PUT failed: {}", e)))?,
        };

        Ok(presigned.uri().to_string())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            bucket,
            key
        )
    }

    fn default_presign_ttl(&self) -> Duration {
        Duration::from_secs(self.config.presign_ttl_secs)
    }
}

/// One multipart part: 1-based part number plus the byte range it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PartSpec {
    number: i32,
    offset: u64,
    len: u64,
}

fn plan_parts(size_bytes: u64, part_size: u64) -> Vec<PartSpec> {
    let mut parts = Vec::new();
    let mut offset: u64 = 0;
    let mut number: i32 = 1;

    while offset < size_bytes {
        let len = part_size.min(size_bytes - offset);
        parts.push(PartSpec {
            number,
            offset,
            len,
        });
        offset += len;
        number += 1;
    }

    parts
}

async fn upload_one_part(
    client: Client,
    path: PathBuf,
    bucket: String,
    key: String,
    upload_id: String,
    spec: PartSpec,
) -> StorageResult<CompletedPart> {
    let mut file = tokio::fs::File::open(&path).await?;
    file.seek(SeekFrom::Start(spec.offset)).await?;

    let mut buf = vec![0u8; spec.len as usize];
    file.read_exact(&mut buf).await?;

    let output = client
        .upload_part()
        .bucket(&bucket)
        .key(&key)
        .upload_id(&upload_id)
        .part_number(spec.number)
        .body(ByteStream::from(buf))
        .send()
        .await
        .map_err(|e| StorageError::Transient(format!("Part {} upload failed: {}", spec.number, e)))?;

    let e_tag = output
        .e_tag()
        .ok_or_else(|| StorageError::Internal(format!("Missing ETag for part {}", spec.number)))?;

    Ok(CompletedPart::builder()
        .part_number(spec.number)
        .e_tag(e_tag)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        DEFAULT_MULTIPART_CONCURRENCY, DEFAULT_MULTIPART_THRESHOLD_BYTES, DEFAULT_PRESIGN_TTL_SECS,
    };

    fn test_config() -> StorageConfig {
        StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            public_base_url: "https://cdn.example.com/".to_string(),
            access_key: "test".to_string(),
            secret_key: "test".to_string(),
            region: "us-east-1".to_string(),
            bucket: "creatives".to_string(),
            pool_size: 16,
            multipart_threshold_bytes: DEFAULT_MULTIPART_THRESHOLD_BYTES,
            multipart_concurrency: DEFAULT_MULTIPART_CONCURRENCY,
            presign_ttl_secs: DEFAULT_PRESIGN_TTL_SECS,
        }
    }

    #[test]
    fn test_public_url_trims_trailing_slash() {
        let store = S3ObjectStore::new(test_config());
        assert_eq!(
            store.public_url("creatives", "camp1/variants/var1/1x1.png"),
            "https://cdn.example.com/creatives/camp1/variants/var1/1x1.png"
        );
    }

    #[test]
    fn test_public_url_is_pure_and_deterministic() {
        let store = S3ObjectStore::new(test_config());
        let a = store.public_url("b", "k");
        let b = store.public_url("b", "k");
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_presign_ttl_is_24_hours() {
        let store = S3ObjectStore::new(test_config());
        assert_eq!(store.default_presign_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_plan_parts_exact_multiple() {
        let parts = plan_parts(20, 10);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], PartSpec { number: 1, offset: 0, len: 10 });
        assert_eq!(parts[1], PartSpec { number: 2, offset: 10, len: 10 });
    }

    #[test]
    fn test_plan_parts_trailing_remainder() {
        let parts = plan_parts(25, 10);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], PartSpec { number: 3, offset: 20, len: 5 });
    }

    #[test]
    fn test_plan_parts_smaller_than_part_size() {
        let parts = plan_parts(4, 10);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], PartSpec { number: 1, offset: 0, len: 4 });
    }

    #[test]
    fn test_plan_parts_empty_file() {
        assert!(plan_parts(0, 10).is_empty());
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_not_found() {
        let store = S3ObjectStore::new(test_config());
        let err = store
            .upload(
                Path::new("/nonexistent/render.png"),
                "creatives",
                "camp1/variants/var1/1x1.png",
                Some("image/png"),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(!err.is_retryable());
    }
}
