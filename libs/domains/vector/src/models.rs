use serde::{Deserialize, Serialize};
use serde_json::json;

/// Collection of brand-profile embeddings.
pub const BRANDS_COLLECTION: &str = "brands";

/// Collection of ad-creative (copy variant) embeddings.
pub const AD_CREATIVES_COLLECTION: &str = "ad_creatives";

/// Minimum similarity score for a brand hit to be returned.
pub const BRAND_SCORE_THRESHOLD: f32 = 0.6;

/// Minimum similarity score for an ad-creative hit to be returned.
pub const AD_SCORE_THRESHOLD: f32 = 0.5;

/// Logical point key for a brand profile: `brand_{campaignId}`.
///
/// Stability contract: this naming makes upserts idempotent (same campaign,
/// same key, overwrite not duplicate) and must not change without migration.
pub fn brand_point_key(campaign_id: &str) -> String {
    format!("brand_{}", campaign_id)
}

/// Logical point key for an ad-copy variant: `variant_{copyVariantId}`.
pub fn variant_point_key(copy_variant_id: &str) -> String {
    format!("variant_{}", copy_variant_id)
}

/// Structured brand record extracted from a campaign's intake step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandProfile {
    pub campaign_id: String,
    pub brand_name: String,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub value_propositions: Vec<String>,
    #[serde(default)]
    pub tone_summary: Option<String>,
    #[serde(default)]
    pub key_terms: Vec<String>,
    #[serde(default)]
    pub confidence_score: f64,
}

impl BrandProfile {
    /// Deterministic text serialization fed to the embedder.
    ///
    /// Field order is fixed (name, industry, tagline, up to 3 value
    /// propositions, tone, up to 10 key terms) so that identical input
    /// always produces identical text, and therefore identical embeddings.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![format!("Brand: {}", self.brand_name)];

        if let Some(industry) = &self.industry {
            parts.push(format!("Industry: {}", industry));
        }
        if let Some(tagline) = &self.tagline {
            parts.push(format!("Tagline: {}", tagline));
        }
        if !self.value_propositions.is_empty() {
            let props: Vec<&str> = self
                .value_propositions
                .iter()
                .take(3)
                .map(String::as_str)
                .collect();
            parts.push(format!("Value propositions: {}", props.join("; ")));
        }
        if let Some(tone) = &self.tone_summary {
            parts.push(format!("Tone: {}", tone));
        }
        if !self.key_terms.is_empty() {
            let terms: Vec<&str> = self.key_terms.iter().take(10).map(String::as_str).collect();
            parts.push(format!("Key terms: {}", terms.join(", ")));
        }

        parts.join(". ")
    }

    /// Payload stored alongside the brand vector.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "point_key": brand_point_key(&self.campaign_id),
            "brand_name": self.brand_name,
            "website_url": self.website_url,
            "industry": self.industry,
            "tagline": self.tagline,
            "value_propositions": self.value_propositions,
            "tone_summary": self.tone_summary,
            "key_terms": self.key_terms,
            "confidence_score": self.confidence_score,
            "campaign_id": self.campaign_id,
        })
    }
}

/// One generated ad-copy variant for a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyVariant {
    pub copy_variant_id: String,
    pub campaign_id: String,
    pub headline: String,
    pub primary_text: String,
    #[serde(default)]
    pub cta: Option<String>,
    #[serde(default)]
    pub angle: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub performance_score: Option<f64>,
    #[serde(default)]
    pub is_approved: bool,
}

impl CopyVariant {
    /// Deterministic text serialization fed to the embedder:
    /// `headline + ". " + primaryText`, with an
    /// ` [Angle: X, Emotion: Y]` suffix when either annotation is present.
    pub fn embedding_text(&self) -> String {
        let mut text = format!("{}. {}", self.headline, self.primary_text);

        let mut annotations = Vec::new();
        if let Some(angle) = &self.angle {
            annotations.push(format!("Angle: {}", angle));
        }
        if let Some(emotion) = &self.emotion {
            annotations.push(format!("Emotion: {}", emotion));
        }
        if !annotations.is_empty() {
            text.push_str(&format!(" [{}]", annotations.join(", ")));
        }

        text
    }

    /// Payload stored alongside the variant vector.
    pub fn to_payload(&self) -> serde_json::Value {
        json!({
            "point_key": variant_point_key(&self.copy_variant_id),
            "copy_variant_id": self.copy_variant_id,
            "campaign_id": self.campaign_id,
            "headline": self.headline,
            "primary_text": self.primary_text,
            "cta": self.cta,
            "angle": self.angle,
            "emotion": self.emotion,
            "platform": self.platform,
            "persona": self.persona,
            "performance_score": self.performance_score.unwrap_or(0.0),
            "is_approved": self.is_approved,
        })
    }
}

/// A point to upsert: logical key, embedding vector, and filterable payload.
///
/// The key is derived from domain identifiers (`brand_{campaignId}`,
/// `variant_{copyVariantId}`), so repeated upserts of the same logical
/// entity overwrite rather than duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub key: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

impl VectorPoint {
    pub fn new(key: String, vector: Vec<f32>, payload: serde_json::Value) -> Self {
        Self {
            key,
            vector,
            payload,
        }
    }
}

/// One ranked similarity-search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityHit {
    pub key: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

/// Parameters for a find-similar-brands search.
#[derive(Debug, Clone)]
pub struct SimilarBrandsQuery {
    pub vector: Vec<f32>,
    pub limit: u64,
    pub min_confidence: f64,
    pub exclude_brand_name: Option<String>,
}

/// Parameters for a find-similar-ads search. Filters AND together:
/// only the predicates that are requested are applied.
#[derive(Debug, Clone)]
pub struct SimilarAdsQuery {
    pub vector: Vec<f32>,
    pub limit: u64,
    pub angle: Option<String>,
    pub min_performance: Option<f64>,
    pub only_approved: bool,
}
