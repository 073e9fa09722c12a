use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
    Filter, PointId, PointStruct, PointsIdsList, Range, ScoredPoint, SearchPointsBuilder,
    SetPayloadPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::QdrantConfig;
use crate::conversions::{json_object_to_payload, payload_to_json_object};
use crate::error::{VectorError, VectorResult};
use crate::index::VectorIndex;
use crate::models::{
    AD_CREATIVES_COLLECTION, AD_SCORE_THRESHOLD, BRAND_SCORE_THRESHOLD, BRANDS_COLLECTION,
    SimilarAdsQuery, SimilarBrandsQuery, SimilarityHit, VectorPoint,
};

/// Upsert batches are chunked to respect request-size limits.
const UPSERT_BATCH_SIZE: usize = 100;

struct CollectionSpec {
    name: &'static str,
    payload_indexes: &'static [(&'static str, FieldType)],
}

const COLLECTION_SPECS: &[CollectionSpec] = &[
    CollectionSpec {
        name: BRANDS_COLLECTION,
        payload_indexes: &[
            ("confidence_score", FieldType::Float),
            ("brand_name", FieldType::Keyword),
            ("industry", FieldType::Keyword),
            ("campaign_id", FieldType::Keyword),
        ],
    },
    CollectionSpec {
        name: AD_CREATIVES_COLLECTION,
        payload_indexes: &[
            ("performance_score", FieldType::Float),
            ("angle", FieldType::Keyword),
            ("is_approved", FieldType::Bool),
            ("campaign_id", FieldType::Keyword),
            ("platform", FieldType::Keyword),
        ],
    },
];

/// Qdrant-backed implementation of `VectorIndex`.
///
/// Construction never fails: if the index is unreachable at startup the
/// client comes up disabled, writes report `false`, searches return empty.
pub struct QdrantIndex {
    client: Option<Qdrant>,
    config: QdrantConfig,
}

impl QdrantIndex {
    pub async fn connect(config: QdrantConfig) -> Self {
        let client = match Self::build_client(&config) {
            Ok(client) => match client.health_check().await {
                Ok(_) => {
                    info!(url = %config.url, "Connected to vector index");
                    Some(client)
                }
                Err(e) => {
                    warn!(
                        url = %config.url,
                        error = %e,
                        "Vector index unreachable at startup, similarity features disabled"
                    );
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to build vector index client, similarity features disabled");
                None
            }
        };

        Self { client, config }
    }

    pub fn from_client(client: Qdrant, config: QdrantConfig) -> Self {
        Self {
            client: Some(client),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn build_client(config: &QdrantConfig) -> VectorResult<Qdrant> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        builder
            .build()
            .map_err(|e| VectorError::Qdrant(format!("Failed to build client: {}", e)))
    }
}

/// Qdrant accepts only u64 or UUID point ids, so the logical point key
/// (`brand_{campaignId}`, `variant_{copyVariantId}`) maps to a
/// deterministic UUIDv5. Same key, same UUID: upsert stays idempotent.
/// The logical key itself travels in the `point_key` payload field.
fn point_id(key: &str) -> PointId {
    PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string())
}

fn point_id_string(id: Option<&PointId>) -> String {
    match id.and_then(|p| p.point_id_options.as_ref()) {
        Some(PointIdOptions::Uuid(uuid_str)) => uuid_str.clone(),
        Some(PointIdOptions::Num(num)) => num.to_string(),
        None => String::new(),
    }
}

fn hit_from_scored(point: ScoredPoint) -> SimilarityHit {
    let key = point
        .payload
        .get("point_key")
        .and_then(|v| match &v.kind {
            Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| point_id_string(point.id.as_ref()));

    SimilarityHit {
        key,
        score: point.score,
        payload: payload_to_json_object(point.payload),
    }
}

fn brand_filter(min_confidence: f64, exclude_brand_name: Option<String>) -> Filter {
    let mut filter = Filter {
        must: vec![Condition::range(
            "confidence_score",
            Range {
                gte: Some(min_confidence),
                ..Default::default()
            },
        )],
        ..Default::default()
    };

    if let Some(name) = exclude_brand_name {
        filter.must_not.push(Condition::matches("brand_name", name));
    }

    filter
}

fn ads_filter(angle: Option<String>, min_performance: Option<f64>, only_approved: bool) -> Filter {
    let mut must = Vec::new();

    if let Some(min_performance) = min_performance {
        must.push(Condition::range(
            "performance_score",
            Range {
                gte: Some(min_performance),
                ..Default::default()
            },
        ));
    }
    if let Some(angle) = angle {
        must.push(Condition::matches("angle", angle));
    }
    if only_approved {
        must.push(Condition::matches("is_approved", true));
    }

    Filter {
        must,
        ..Default::default()
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collections(&self) -> VectorResult<bool> {
        let Some(client) = &self.client else {
            return Ok(false);
        };

        for spec in COLLECTION_SPECS {
            if !client.collection_exists(spec.name).await? {
                client
                    .create_collection(CreateCollectionBuilder::new(spec.name).vectors_config(
                        VectorParamsBuilder::new(self.config.dimensions as u64, Distance::Cosine),
                    ))
                    .await?;
                info!(
                    collection = spec.name,
                    dimensions = self.config.dimensions,
                    "Created vector collection"
                );
            }

            // Safe to re-issue for indexes that already exist
            for (field, field_type) in spec.payload_indexes {
                client
                    .create_field_index(CreateFieldIndexCollectionBuilder::new(
                        spec.name,
                        *field,
                        *field_type,
                    ))
                    .await?;
            }
        }

        Ok(true)
    }

    async fn upsert(&self, collection: &str, points: Vec<VectorPoint>) -> VectorResult<bool> {
        let Some(client) = &self.client else {
            return Ok(false);
        };

        if points.is_empty() {
            return Ok(true);
        }

        for chunk in points.chunks(UPSERT_BATCH_SIZE) {
            let qdrant_points: Vec<PointStruct> = chunk
                .iter()
                .map(|p| {
                    PointStruct::new(
                        point_id(&p.key),
                        p.vector.clone(),
                        json_object_to_payload(&p.payload),
                    )
                })
                .collect();

            // Chunks already written stay committed if a later one fails;
            // the index is append/overwrite only and retries re-derive the
            // same point ids.
            client
                .upsert_points(UpsertPointsBuilder::new(collection, qdrant_points).wait(true))
                .await?;

            debug!(collection, batch = chunk.len(), "Upserted point batch");
        }

        Ok(true)
    }

    async fn search_similar_brands(
        &self,
        query: SimilarBrandsQuery,
    ) -> VectorResult<Vec<SimilarityHit>> {
        let Some(client) = &self.client else {
            return Ok(vec![]);
        };

        let builder = SearchPointsBuilder::new(BRANDS_COLLECTION, query.vector, query.limit)
            .filter(brand_filter(query.min_confidence, query.exclude_brand_name))
            .score_threshold(BRAND_SCORE_THRESHOLD)
            .with_payload(true);

        let results = client.search_points(builder).await?;

        Ok(results.result.into_iter().map(hit_from_scored).collect())
    }

    async fn search_similar_ads(
        &self,
        query: SimilarAdsQuery,
    ) -> VectorResult<Vec<SimilarityHit>> {
        let Some(client) = &self.client else {
            return Ok(vec![]);
        };

        let builder = SearchPointsBuilder::new(AD_CREATIVES_COLLECTION, query.vector, query.limit)
            .filter(ads_filter(
                query.angle,
                query.min_performance,
                query.only_approved,
            ))
            .score_threshold(AD_SCORE_THRESHOLD)
            .with_payload(true);

        let results = client.search_points(builder).await?;

        Ok(results.result.into_iter().map(hit_from_scored).collect())
    }

    async fn update_ad_performance(
        &self,
        point_key: &str,
        performance_score: f64,
        is_approved: bool,
    ) -> VectorResult<bool> {
        let Some(client) = &self.client else {
            return Ok(false);
        };

        let payload = json_object_to_payload(&serde_json::json!({
            "performance_score": performance_score,
            "is_approved": is_approved,
        }));

        client
            .set_payload(
                SetPayloadPointsBuilder::new(AD_CREATIVES_COLLECTION, payload)
                    .points_selector(PointsIdsList {
                        ids: vec![point_id(point_key)],
                    })
                    .wait(true),
            )
            .await?;

        debug!(point_key, performance_score, is_approved, "Patched ad performance payload");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_deterministic() {
        assert_eq!(point_id("brand_camp1"), point_id("brand_camp1"));
        assert_ne!(point_id("brand_camp1"), point_id("brand_camp2"));
    }

    #[test]
    fn test_point_id_is_a_uuid() {
        let id = point_id("variant_var1");
        match id.point_id_options {
            Some(PointIdOptions::Uuid(u)) => {
                assert!(Uuid::parse_str(&u).is_ok());
            }
            other => panic!("Expected UUID point id, got {:?}", other),
        }
    }

    #[test]
    fn test_brand_filter_composition() {
        let filter = brand_filter(0.7, Some("Acme".to_string()));
        assert_eq!(filter.must.len(), 1);
        assert_eq!(filter.must_not.len(), 1);

        let filter = brand_filter(0.7, None);
        assert_eq!(filter.must.len(), 1);
        assert!(filter.must_not.is_empty());
    }

    #[test]
    fn test_ads_filter_composes_requested_predicates_only() {
        let all = ads_filter(Some("benefit".to_string()), Some(70.0), true);
        assert_eq!(all.must.len(), 3);

        let none = ads_filter(None, None, false);
        assert!(none.must.is_empty());

        let angle_only = ads_filter(Some("pain".to_string()), None, false);
        assert_eq!(angle_only.must.len(), 1);
    }

    #[test]
    fn test_hit_prefers_logical_point_key() {
        let mut payload = std::collections::HashMap::new();
        payload.insert(
            "point_key".to_string(),
            qdrant_client::qdrant::Value::from("brand_camp1".to_string()),
        );

        let point = ScoredPoint {
            id: Some(point_id("brand_camp1")),
            payload,
            score: 0.87,
            ..Default::default()
        };

        let hit = hit_from_scored(point);
        assert_eq!(hit.key, "brand_camp1");
        assert_eq!(hit.score, 0.87);
        assert_eq!(hit.payload["point_key"], "brand_camp1");
    }

    #[test]
    fn test_hit_falls_back_to_raw_point_id() {
        let point = ScoredPoint {
            id: Some(PointId::from(7u64)),
            payload: std::collections::HashMap::new(),
            score: 0.5,
            ..Default::default()
        };

        let hit = hit_from_scored(point);
        assert_eq!(hit.key, "7");
    }
}
