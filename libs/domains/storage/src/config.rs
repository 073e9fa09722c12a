use core_config::{env_or_default, env_parse_or, env_required, ConfigError, FromEnv};

/// Default presigned URL lifetime: 24 hours.
pub const DEFAULT_PRESIGN_TTL_SECS: u64 = 86_400;

/// Files at or above this size are uploaded via S3 multipart (64 MiB).
pub const DEFAULT_MULTIPART_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024;

/// Maximum part uploads in flight for a single multipart transfer.
pub const DEFAULT_MULTIPART_CONCURRENCY: usize = 8;

/// Object store configuration (S3-compatible endpoint, MinIO-style)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint, e.g. `http://minio:9000`
    pub endpoint: String,

    /// Base URL for public object access. Falls back to the API endpoint
    /// when the store is not fronted by a CDN or separate public host.
    pub public_base_url: String,

    pub access_key: String,
    pub secret_key: String,
    pub region: String,

    /// Default bucket for rendered creative assets
    pub bucket: String,

    /// Upper bound on pooled connections; also caps multipart parallelism.
    pub pool_size: usize,

    pub multipart_threshold_bytes: u64,
    pub multipart_concurrency: usize,

    pub presign_ttl_secs: u64,
}

impl StorageConfig {
    /// Effective number of concurrent part uploads for one multipart transfer.
    pub fn effective_multipart_concurrency(&self) -> usize {
        self.multipart_concurrency.min(self.pool_size).max(1)
    }
}

impl FromEnv for StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env_required("STORAGE_ENDPOINT")?;
        let public_base_url = env_or_default("STORAGE_PUBLIC_URL", &endpoint);

        Ok(Self {
            public_base_url,
            access_key: env_required("STORAGE_ACCESS_KEY")?,
            secret_key: env_required("STORAGE_SECRET_KEY")?,
            region: env_or_default("STORAGE_REGION", "us-east-1"),
            bucket: env_or_default("STORAGE_BUCKET", "creatives"),
            pool_size: env_parse_or("STORAGE_POOL_SIZE", 16)?,
            multipart_threshold_bytes: env_parse_or(
                "STORAGE_MULTIPART_THRESHOLD_BYTES",
                DEFAULT_MULTIPART_THRESHOLD_BYTES,
            )?,
            multipart_concurrency: env_parse_or(
                "STORAGE_MULTIPART_CONCURRENCY",
                DEFAULT_MULTIPART_CONCURRENCY,
            )?,
            presign_ttl_secs: env_parse_or("STORAGE_PRESIGN_TTL_SECS", DEFAULT_PRESIGN_TTL_SECS)?,
            endpoint,
        })
    }
}
