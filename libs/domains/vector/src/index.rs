use async_trait::async_trait;

use crate::error::VectorResult;
use crate::models::{SimilarAdsQuery, SimilarBrandsQuery, SimilarityHit, VectorPoint};

/// Similarity-index operations over the two pipeline collections
/// (`brands`, `ad_creatives`).
///
/// The index is an advisory subsystem: when the backing store is
/// unreachable at process start, implementations run disabled: write
/// operations return `Ok(false)` and searches return empty results instead
/// of raising. Availability over consistency, by contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the `brands` and `ad_creatives` collections and their payload
    /// indexes when absent. Idempotent; safe to call on every process start.
    /// Returns `false` when the index is disabled.
    async fn ensure_collections(&self) -> VectorResult<bool>;

    /// Overwrite-by-key upsert, batched internally. Already-written batches
    /// stay committed when a later batch fails (append/overwrite-only index,
    /// no compensating rollback). Returns `false` when the index is disabled.
    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> VectorResult<bool>;

    /// Ranked brand similarity search, filtered by minimum confidence and
    /// optionally excluding an exact brand name.
    async fn search_similar_brands(
        &self,
        query: SimilarBrandsQuery,
    ) -> VectorResult<Vec<SimilarityHit>>;

    /// Ranked ad similarity search; requested predicates AND together.
    async fn search_similar_ads(&self, query: SimilarAdsQuery)
        -> VectorResult<Vec<SimilarityHit>>;

    /// Patch `performance_score`/`is_approved` on one ad point without
    /// touching its stored vector. Returns `false` when the index is disabled.
    async fn update_ad_performance(
        &self,
        point_key: &str,
        performance_score: f64,
        is_approved: bool,
    ) -> VectorResult<bool>;
}
