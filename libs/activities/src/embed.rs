//! Embed and similarity-query activities.
//!
//! Embedding degradation is not an error: a zero-vector sentinel means the
//! backend was unavailable, and the activity reports the affected items in
//! `skipped` instead of failing. Sentinel vectors are never upserted, and a
//! sentinel query embedding yields an empty result set.

use domain_vector::embedding::EmbeddingGenerator;
use domain_vector::{
    AD_CREATIVES_COLLECTION, BRANDS_COLLECTION, BrandProfile, CopyVariant, SimilarAdsQuery,
    SimilarBrandsQuery, SimilarityHit, VectorIndex, VectorPoint, brand_point_key,
    variant_point_key,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::ActivityContext;
use crate::error::ActivityResult;

const EMBED_BRAND_ACTIVITY: &str = "embed_brand";
const EMBED_VARIANTS_ACTIVITY: &str = "embed_variants";
const SIMILAR_BRANDS_ACTIVITY: &str = "find_similar_brands";
const SIMILAR_ADS_ACTIVITY: &str = "find_similar_ads";

/// What an embed activity wrote to the index.
///
/// `skipped` counts items that could not be embedded (backend unavailable)
/// or could not be written (index disabled); disjoint from `count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingOutcome {
    pub point_ids: Vec<String>,
    pub collection: String,
    pub count: usize,
    pub skipped: usize,
}

impl EmbeddingOutcome {
    fn skipped(collection: &str, skipped: usize) -> Self {
        Self {
            point_ids: vec![],
            collection: collection.to_string(),
            count: 0,
            skipped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindSimilarBrandsInput {
    pub brand: BrandProfile,
    pub limit: u64,
    pub min_confidence: f64,
    /// Exclude exact matches on the query brand's own name.
    #[serde(default)]
    pub exclude_self: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindSimilarAdsInput {
    pub variant: CopyVariant,
    pub limit: u64,
    #[serde(default)]
    pub angle: Option<String>,
    #[serde(default)]
    pub min_performance: Option<f64>,
    #[serde(default)]
    pub only_approved: bool,
}

/// Embed one brand profile and upsert it under `brand_{campaignId}`.
pub async fn embed_brand(
    ctx: &ActivityContext,
    generator: &EmbeddingGenerator,
    index: &dyn VectorIndex,
    brand: &BrandProfile,
) -> ActivityResult<EmbeddingOutcome> {
    let point_key = brand_point_key(&brand.campaign_id);

    ctx.ensure_active()?;
    ctx.heartbeat(EMBED_BRAND_ACTIVITY, "embedding", Some(point_key.clone()));

    let vector = generator.embed_brand_profile(brand).await;
    if EmbeddingGenerator::is_zero_sentinel(&vector) {
        warn!(
            campaign_id = brand.campaign_id,
            "Brand embedding unavailable, skipping upsert"
        );
        return Ok(EmbeddingOutcome::skipped(BRANDS_COLLECTION, 1));
    }

    ctx.ensure_active()?;
    ctx.heartbeat(EMBED_BRAND_ACTIVITY, "upserting", Some(point_key.clone()));

    let point = VectorPoint::new(point_key.clone(), vector, brand.to_payload());
    if !index.upsert(BRANDS_COLLECTION, vec![point]).await? {
        warn!(
            campaign_id = brand.campaign_id,
            "Vector index disabled, brand embedding not stored"
        );
        return Ok(EmbeddingOutcome::skipped(BRANDS_COLLECTION, 1));
    }

    info!(campaign_id = brand.campaign_id, point_key, "Embedded brand profile");
    Ok(EmbeddingOutcome {
        point_ids: vec![point_key],
        collection: BRANDS_COLLECTION.to_string(),
        count: 1,
        skipped: 0,
    })
}

/// Embed a list of ad-copy variants and upsert them under
/// `variant_{copyVariantId}`.
///
/// Degradation is all-or-nothing per invocation: any sentinel in the batch
/// skips the whole batch, since a partially degraded batch is ambiguous.
pub async fn embed_variants(
    ctx: &ActivityContext,
    generator: &EmbeddingGenerator,
    index: &dyn VectorIndex,
    variants: &[CopyVariant],
) -> ActivityResult<EmbeddingOutcome> {
    if variants.is_empty() {
        return Ok(EmbeddingOutcome::skipped(AD_CREATIVES_COLLECTION, 0));
    }

    ctx.ensure_active()?;
    ctx.heartbeat(
        EMBED_VARIANTS_ACTIVITY,
        "embedding",
        Some(format!("{} variants", variants.len())),
    );

    let texts: Vec<String> = variants.iter().map(|v| v.embedding_text()).collect();
    let vectors = generator.embed_batch(&texts).await;

    if vectors.iter().any(|v| EmbeddingGenerator::is_zero_sentinel(v)) {
        warn!(
            count = variants.len(),
            "Variant batch embedding unavailable, skipping upsert"
        );
        return Ok(EmbeddingOutcome::skipped(
            AD_CREATIVES_COLLECTION,
            variants.len(),
        ));
    }

    let mut points = Vec::with_capacity(variants.len());
    for (variant, vector) in variants.iter().zip(vectors) {
        ctx.ensure_active()?;
        let point_key = variant_point_key(&variant.copy_variant_id);
        ctx.heartbeat(EMBED_VARIANTS_ACTIVITY, "building", Some(point_key.clone()));
        points.push(VectorPoint::new(point_key, vector, variant.to_payload()));
    }

    ctx.ensure_active()?;
    ctx.heartbeat(
        EMBED_VARIANTS_ACTIVITY,
        "upserting",
        Some(format!("{} points", points.len())),
    );

    let point_ids: Vec<String> = points.iter().map(|p| p.key.clone()).collect();
    if !index.upsert(AD_CREATIVES_COLLECTION, points).await? {
        warn!(
            count = variants.len(),
            "Vector index disabled, variant embeddings not stored"
        );
        return Ok(EmbeddingOutcome::skipped(
            AD_CREATIVES_COLLECTION,
            variants.len(),
        ));
    }

    info!(count = point_ids.len(), "Embedded ad-copy variants");
    Ok(EmbeddingOutcome {
        count: point_ids.len(),
        point_ids,
        collection: AD_CREATIVES_COLLECTION.to_string(),
        skipped: 0,
    })
}

/// Find brands similar to the given profile.
///
/// Under a degraded embedding backend the answer is defined as "no similar
/// brands found", never an error.
pub async fn find_similar_brands(
    ctx: &ActivityContext,
    generator: &EmbeddingGenerator,
    index: &dyn VectorIndex,
    input: &FindSimilarBrandsInput,
) -> ActivityResult<Vec<SimilarityHit>> {
    ctx.ensure_active()?;
    ctx.heartbeat(SIMILAR_BRANDS_ACTIVITY, "embedding", None);

    let vector = generator.embed_brand_profile(&input.brand).await;
    if EmbeddingGenerator::is_zero_sentinel(&vector) {
        info!("Query embedding unavailable, returning no similar brands");
        return Ok(vec![]);
    }

    ctx.ensure_active()?;
    ctx.heartbeat(SIMILAR_BRANDS_ACTIVITY, "searching", None);

    let hits = index
        .search_similar_brands(SimilarBrandsQuery {
            vector,
            limit: input.limit,
            min_confidence: input.min_confidence,
            exclude_brand_name: input
                .exclude_self
                .then(|| input.brand.brand_name.clone()),
        })
        .await?;

    Ok(hits)
}

/// Find ad creatives similar to the given variant, optionally restricted to
/// an angle, a performance floor, and approved-only points.
pub async fn find_similar_ads(
    ctx: &ActivityContext,
    generator: &EmbeddingGenerator,
    index: &dyn VectorIndex,
    input: &FindSimilarAdsInput,
) -> ActivityResult<Vec<SimilarityHit>> {
    ctx.ensure_active()?;
    ctx.heartbeat(SIMILAR_ADS_ACTIVITY, "embedding", None);

    let vector = generator.embed_copy_variant(&input.variant).await;
    if EmbeddingGenerator::is_zero_sentinel(&vector) {
        info!("Query embedding unavailable, returning no similar ads");
        return Ok(vec![]);
    }

    ctx.ensure_active()?;
    ctx.heartbeat(SIMILAR_ADS_ACTIVITY, "searching", None);

    let hits = index
        .search_similar_ads(SimilarAdsQuery {
            vector,
            limit: input.limit,
            angle: input.angle.clone(),
            min_performance: input.min_performance,
            only_approved: input.only_approved,
        })
        .await?;

    Ok(hits)
}
