//! Object Storage Domain Library
//!
//! Content-addressed storage for rendered creative assets, backed by any
//! S3-compatible endpoint (AWS S3, MinIO).
//!
//! Object keys are derived deterministically from domain identifiers
//! (`{campaignId}/variants/{variantId}/{formatName}.png`), which makes
//! uploads naturally idempotent: a retried activity re-derives the same key
//! and finds the object already present.

pub mod client;
pub mod config;
pub mod error;
pub mod keys;

pub use client::{ObjectStore, PresignMethod, S3ObjectStore};
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use keys::variant_object_key;
