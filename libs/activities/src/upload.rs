//! Upload and batch-upload activities.
//!
//! One invocation walks `init -> validating -> checking_exists ->
//! (uploading | already_exists) -> generating_url -> done`, emitting a
//! heartbeat at every transition. The deterministic object key is the
//! idempotency mechanism: a retry after a crash re-derives the same key,
//! finds the object, and skips the transfer.

use std::collections::HashMap;
use std::path::PathBuf;

use domain_storage::{ObjectStore, PresignMethod, variant_object_key};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::ActivityContext;
use crate::error::{ActivityError, ActivityResult};

const UPLOAD_ACTIVITY: &str = "upload_asset";
const BATCH_ACTIVITY: &str = "batch_upload_assets";

/// Stages of one upload invocation, in heartbeat order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Init,
    Validating,
    CheckingExists,
    Uploading,
    AlreadyExists,
    GeneratingUrl,
    Done,
}

impl UploadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Validating => "validating",
            Self::CheckingExists => "checking_exists",
            Self::Uploading => "uploading",
            Self::AlreadyExists => "already_exists",
            Self::GeneratingUrl => "generating_url",
            Self::Done => "done",
        }
    }
}

/// Serialized input for one upload invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadAssetInput {
    pub campaign_id: String,
    pub variant_id: String,
    pub format_name: String,
    pub local_path: PathBuf,
    pub bucket: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Durable URLs and identifiers for one stored asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub object_url: String,
    pub presigned_url: String,
    pub bucket: String,
    pub object_key: String,
    pub size_bytes: u64,
}

/// One rendered format of a variant, in caller order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFormat {
    pub format_name: String,
    pub local_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUploadInput {
    pub campaign_id: String,
    pub variant_id: String,
    pub bucket: String,
    pub formats: Vec<UploadFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUploadResult {
    pub uploads: Vec<UploadResult>,
    pub total_bytes: u64,
}

/// Idempotently ensure one rendered asset exists in object storage and
/// return its stable URLs.
///
/// A missing source file is a `Validation` error (fatal for this
/// invocation); storage outages surface as retryable errors for the
/// orchestrator's backoff policy.
pub async fn upload_asset(
    ctx: &ActivityContext,
    store: &dyn ObjectStore,
    input: &UploadAssetInput,
) -> ActivityResult<UploadResult> {
    let object_key = variant_object_key(&input.campaign_id, &input.variant_id, &input.format_name);
    let beat = |stage: UploadStage| {
        ctx.heartbeat(UPLOAD_ACTIVITY, stage.as_str(), Some(object_key.clone()));
    };

    beat(UploadStage::Init);
    ctx.ensure_active()?;

    beat(UploadStage::Validating);
    let size_bytes = match tokio::fs::metadata(&input.local_path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ActivityError::Validation(format!(
                "Source file missing: {}",
                input.local_path.display()
            )));
        }
        Err(e) => {
            return Err(ActivityError::Transient(format!(
                "Failed to stat source file {}: {}",
                input.local_path.display(),
                e
            )));
        }
    };

    ctx.ensure_active()?;
    beat(UploadStage::CheckingExists);
    let already_exists = store.exists(&input.bucket, &object_key).await?;

    let object_url = if already_exists {
        beat(UploadStage::AlreadyExists);
        info!(
            object_key,
            bucket = input.bucket,
            "Object already present, skipping transfer"
        );
        store.public_url(&input.bucket, &object_key)
    } else {
        ctx.ensure_active()?;
        beat(UploadStage::Uploading);

        let metadata = HashMap::from([
            ("campaign-id".to_string(), input.campaign_id.clone()),
            ("variant-id".to_string(), input.variant_id.clone()),
            (
                "uploaded-at".to_string(),
                chrono::Utc::now().to_rfc3339(),
            ),
        ]);

        store
            .upload(
                &input.local_path,
                &input.bucket,
                &object_key,
                Some(input.content_type.as_deref().unwrap_or("image/png")),
                Some(metadata),
            )
            .await?
    };

    beat(UploadStage::GeneratingUrl);
    let presigned_url = store
        .presign(
            &input.bucket,
            &object_key,
            store.default_presign_ttl(),
            PresignMethod::Get,
        )
        .await?;

    beat(UploadStage::Done);

    Ok(UploadResult {
        object_url,
        presigned_url,
        bucket: input.bucket.clone(),
        object_key,
        size_bytes,
    })
}

/// Upload every rendered format of a variant, strictly sequentially to
/// bound pressure on the object store.
///
/// A failure on format `i` aborts the batch; each sub-upload is itself
/// idempotent, so a full-batch retry by the orchestrator is cheap.
pub async fn batch_upload_assets(
    ctx: &ActivityContext,
    store: &dyn ObjectStore,
    input: &BatchUploadInput,
) -> ActivityResult<BatchUploadResult> {
    let mut uploads = Vec::with_capacity(input.formats.len());
    let mut total_bytes = 0u64;

    for (i, format) in input.formats.iter().enumerate() {
        ctx.ensure_active()?;
        ctx.heartbeat(
            BATCH_ACTIVITY,
            &format!("format {}/{}", i + 1, input.formats.len()),
            Some(format.format_name.clone()),
        );

        let item = UploadAssetInput {
            campaign_id: input.campaign_id.clone(),
            variant_id: input.variant_id.clone(),
            format_name: format.format_name.clone(),
            local_path: format.local_path.clone(),
            bucket: input.bucket.clone(),
            content_type: None,
        };

        let result = match upload_asset(ctx, store, &item).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    format_name = format.format_name,
                    completed = uploads.len(),
                    error = %e,
                    "Batch upload aborted"
                );
                return Err(e);
            }
        };

        total_bytes += result.size_bytes;
        uploads.push(result);
    }

    Ok(BatchUploadResult {
        uploads,
        total_bytes,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;

    use domain_storage::{StorageError, StorageResult};
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;
    use crate::context::Heartbeat;

    mockall::mock! {
        Store {}

        #[async_trait::async_trait]
        impl ObjectStore for Store {
            async fn upload<'a>(
                &self,
                local_path: &Path,
                bucket: &str,
                key: &str,
                content_type: Option<&'a str>,
                metadata: Option<HashMap<String, String>>,
            ) -> StorageResult<String>;
            async fn download(&self, bucket: &str, key: &str, destination: &Path) -> StorageResult<u64>;
            async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;
            async fn presign(
                &self,
                bucket: &str,
                key: &str,
                ttl: Duration,
                method: PresignMethod,
            ) -> StorageResult<String>;
            fn public_url(&self, bucket: &str, key: &str) -> String;
            fn default_presign_ttl(&self) -> Duration;
        }
    }

    fn temp_file_with(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn input_for(path: &Path) -> UploadAssetInput {
        UploadAssetInput {
            campaign_id: "camp1".to_string(),
            variant_id: "var1".to_string(),
            format_name: "1x1".to_string(),
            local_path: path.to_path_buf(),
            bucket: "creatives".to_string(),
            content_type: None,
        }
    }

    fn drain_stages(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Heartbeat>) -> Vec<String> {
        let mut stages = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(beat) => stages.push(beat.stage),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return stages,
            }
        }
    }

    fn happy_path_store(expect_upload: bool) -> MockStore {
        let mut store = MockStore::new();
        store
            .expect_exists()
            .returning(move |_, _| Ok(!expect_upload));
        if expect_upload {
            store.expect_upload().returning(|_, bucket, key, _, _| {
                Ok(format!("https://cdn.example/{}/{}", bucket, key))
            });
        } else {
            store
                .expect_public_url()
                .returning(|bucket, key| format!("https://cdn.example/{}/{}", bucket, key));
        }
        store
            .expect_default_presign_ttl()
            .return_const(Duration::from_secs(86_400));
        store.expect_presign().returning(|_, key, ttl, _| {
            Ok(format!(
                "https://cdn.example/{}?X-Amz-Expires={}",
                key,
                ttl.as_secs()
            ))
        });
        store
    }

    #[tokio::test]
    async fn test_first_upload_walks_the_full_state_machine() {
        let file = temp_file_with(&[0u8; 100]);
        let store = happy_path_store(true);
        let (ctx, mut rx, _cancel) = ActivityContext::channel();

        let result = upload_asset(&ctx, &store, &input_for(file.path()))
            .await
            .unwrap();

        assert_eq!(result.object_key, "camp1/variants/var1/1x1.png");
        assert_eq!(result.size_bytes, 100);
        assert_eq!(result.bucket, "creatives");
        assert_eq!(
            result.object_url,
            "https://cdn.example/creatives/camp1/variants/var1/1x1.png"
        );
        assert!(result.presigned_url.contains("X-Amz-Expires=86400"));

        assert_eq!(
            drain_stages(&mut rx),
            vec![
                "init",
                "validating",
                "checking_exists",
                "uploading",
                "generating_url",
                "done"
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_takes_the_already_exists_path() {
        let file = temp_file_with(&[0u8; 100]);
        // No upload expectation: a second transfer would fail the test.
        let store = happy_path_store(false);
        let (ctx, mut rx, _cancel) = ActivityContext::channel();

        let result = upload_asset(&ctx, &store, &input_for(file.path()))
            .await
            .unwrap();

        assert_eq!(result.object_key, "camp1/variants/var1/1x1.png");
        assert!(result.presigned_url.contains("X-Amz-Expires"));

        let stages = drain_stages(&mut rx);
        assert!(stages.contains(&"already_exists".to_string()));
        assert!(!stages.contains(&"uploading".to_string()));
    }

    #[tokio::test]
    async fn test_missing_source_file_is_fatal() {
        let store = MockStore::new();
        let ctx = ActivityContext::detached();
        let input = input_for(Path::new("/nonexistent/render/1x1.png"));

        let err = upload_asset(&ctx, &store, &input).await.unwrap_err();
        assert!(matches!(err, ActivityError::Validation(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_storage_outage_is_retryable() {
        let file = temp_file_with(b"png");
        let mut store = MockStore::new();
        store
            .expect_exists()
            .returning(|_, _| Err(StorageError::Transient("connection refused".to_string())));
        let ctx = ActivityContext::detached();

        let err = upload_asset(&ctx, &store, &input_for(file.path()))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cancellation_unwinds_before_any_transfer() {
        let file = temp_file_with(b"png");
        let store = MockStore::new();
        let (ctx, _rx, cancel) = ActivityContext::channel();
        cancel.send(true).unwrap();

        let err = upload_asset(&ctx, &store, &input_for(file.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::Cancelled));
    }

    #[tokio::test]
    async fn test_batch_accumulates_total_bytes_in_order() {
        let square = temp_file_with(&[0u8; 3]);
        let story = temp_file_with(&[0u8; 5]);
        let store = happy_path_store(true);
        let ctx = ActivityContext::detached();

        let input = BatchUploadInput {
            campaign_id: "camp1".to_string(),
            variant_id: "var1".to_string(),
            bucket: "creatives".to_string(),
            formats: vec![
                UploadFormat {
                    format_name: "1x1".to_string(),
                    local_path: square.path().to_path_buf(),
                },
                UploadFormat {
                    format_name: "9x16".to_string(),
                    local_path: story.path().to_path_buf(),
                },
            ],
        };

        let result = batch_upload_assets(&ctx, &store, &input).await.unwrap();

        assert_eq!(result.uploads.len(), 2);
        assert_eq!(result.total_bytes, 8);
        assert_eq!(result.uploads[0].object_key, "camp1/variants/var1/1x1.png");
        assert_eq!(result.uploads[1].object_key, "camp1/variants/var1/9x16.png");
        assert_eq!(
            result.total_bytes,
            result.uploads.iter().map(|u| u.size_bytes).sum::<u64>()
        );
    }

    #[tokio::test]
    async fn test_batch_aborts_on_first_missing_file() {
        let square = temp_file_with(&[0u8; 3]);
        let store = happy_path_store(true);
        let ctx = ActivityContext::detached();

        let input = BatchUploadInput {
            campaign_id: "camp1".to_string(),
            variant_id: "var1".to_string(),
            bucket: "creatives".to_string(),
            formats: vec![
                UploadFormat {
                    format_name: "1x1".to_string(),
                    local_path: square.path().to_path_buf(),
                },
                UploadFormat {
                    format_name: "9x16".to_string(),
                    local_path: PathBuf::from("/nonexistent/9x16.png"),
                },
            ],
        };

        let err = batch_upload_assets(&ctx, &store, &input).await.unwrap_err();
        assert!(matches!(err, ActivityError::Validation(_)));
    }
}
