//! Semantic Embedding Domain Library
//!
//! Turns structured brand/ad records into vector embeddings and answers
//! filtered nearest-neighbor queries over them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌────────────────────┐
//! │  EmbeddingGenerator  │      │  VectorIndex       │
//! │  (batching, zero-    │      │  (trait)           │
//! │   vector sentinel)   │      └─────────┬──────────┘
//! └──────────┬───────────┘                │
//!            │                  ┌─────────▼──────────┐
//! ┌──────────▼───────────┐     │  QdrantIndex        │
//! │  EmbeddingProvider   │     │  (brands,           │
//! │  (trait)             │     │   ad_creatives)     │
//! │   └─ OpenAiProvider  │     └─────────────────────┘
//! └──────────────────────┘
//! ```
//!
//! Degradation is a first-class operating mode, not an error: with no
//! embedding backend the generator emits all-zero sentinel vectors, and
//! with the index unreachable the `QdrantIndex` runs disabled (writes
//! report `false`, searches return empty).

pub mod conversions;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod qdrant;

pub use embedding::{EmbeddingConfig, EmbeddingGenerator, EmbeddingProvider, OpenAiConfig, OpenAiProvider};
pub use error::{VectorError, VectorResult};
pub use index::VectorIndex;
pub use models::{
    AD_CREATIVES_COLLECTION, BRANDS_COLLECTION, BrandProfile, CopyVariant, SimilarAdsQuery,
    SimilarBrandsQuery, SimilarityHit, VectorPoint, brand_point_key, variant_point_key,
};
pub use qdrant::{QdrantConfig, QdrantIndex};
