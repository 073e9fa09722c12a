//! Pipeline Activities
//!
//! Retryable, idempotent units of work invoked by a durable orchestrator:
//! asset upload (single and batch) and brand/variant embedding with
//! similarity queries. Activities receive their service handles explicitly
//! (constructed once at process bootstrap) and report progress/cancellation
//! through an [`ActivityContext`] side channel.
//!
//! Correctness across retries rests on deterministic idempotency keys
//! (object key, vector point key), not on in-process state: every durable
//! write is keyed and overwrite-safe, so a crashed or cancelled invocation
//! is always safe to re-run.

pub mod context;
pub mod embed;
pub mod error;
pub mod upload;

pub use context::{ActivityContext, Heartbeat};
pub use embed::{
    EmbeddingOutcome, FindSimilarAdsInput, FindSimilarBrandsInput, embed_brand, embed_variants,
    find_similar_ads, find_similar_brands,
};
pub use error::{ActivityError, ActivityResult};
pub use upload::{
    BatchUploadInput, BatchUploadResult, UploadAssetInput, UploadFormat, UploadResult,
    UploadStage, batch_upload_assets, upload_asset,
};
