//! Pipeline Worker Service
//!
//! Hosts the asset-publication and semantic-embedding activities: constructs
//! the object store, embedding generator and vector index handles exactly
//! once at bootstrap, makes sure the vector collections exist, and parks
//! until SIGINT/SIGTERM. The durable orchestrator's worker SDK plugs into
//! this shell and drives the activities in `pipeline_activities`.
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator (external)
//!   ↓ (activity invocations, serialized records)
//! pipeline_activities::{upload_asset, batch_upload_assets,
//!                       embed_brand, embed_variants, find_similar_*}
//!   ↓
//! S3ObjectStore          EmbeddingGenerator → QdrantIndex
//! (MinIO / S3 bucket)    (OpenAI-compatible)  (brands, ad_creatives)
//! ```
//!
//! Degraded dependencies do not abort startup: a missing embedding key puts
//! the generator in zero-vector mode, and an unreachable vector index comes
//! up disabled. A misconfigured object store is fatal.

use std::sync::Arc;

use core_config::{Environment, FromEnv};
use domain_storage::{ObjectStore, S3ObjectStore, StorageConfig};
use domain_vector::{EmbeddingGenerator, QdrantConfig, QdrantIndex, VectorIndex};
use eyre::{Result, WrapErr};
use pipeline_activities::{ActivityContext, Heartbeat};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Service handles shared across activity invocations.
///
/// Constructed explicitly at bootstrap and injected into activities; no
/// lazily self-initializing global state.
pub struct ActivityServices {
    pub store: Arc<dyn ObjectStore>,
    pub generator: Arc<EmbeddingGenerator>,
    pub index: Arc<dyn VectorIndex>,
    pub bucket: String,
    pub context: ActivityContext,
}

/// Run the pipeline worker.
///
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Builds the object store client from `STORAGE_*` configuration
/// 3. Builds the embedding generator (degraded mode when unconfigured)
/// 4. Connects to the vector index and ensures both collections exist
/// 5. Parks until SIGINT/SIGTERM; shutdown doubles as activity cancellation
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::install_color_eyre();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting pipeline worker"
    );
    info!("Environment: {:?}", environment);

    let storage_config =
        StorageConfig::from_env().wrap_err("Failed to load storage configuration")?;
    let bucket = storage_config.bucket.clone();
    let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(storage_config));
    info!(bucket, "Object store client ready");

    let generator = Arc::new(
        EmbeddingGenerator::from_env().wrap_err("Failed to load embedding configuration")?,
    );
    if generator.is_degraded() {
        warn!("Embedding backend not configured, embeddings degrade to zero vectors");
    }

    let qdrant_config =
        QdrantConfig::from_env().wrap_err("Failed to load vector index configuration")?;
    let index = QdrantIndex::connect(qdrant_config).await;
    if index
        .ensure_collections()
        .await
        .wrap_err("Failed to ensure vector collections")?
    {
        info!("Vector collections ready");
    } else {
        warn!("Vector index disabled, similarity features unavailable");
    }
    let index: Arc<dyn VectorIndex> = Arc::new(index);

    // Shutdown signal propagates to activities as cooperative cancellation.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // Drain activity heartbeats into the log; the orchestrator SDK would
    // forward these as progress reports instead.
    let (heartbeat_tx, mut heartbeat_rx) = mpsc::unbounded_channel::<Heartbeat>();
    tokio::spawn(async move {
        while let Some(beat) = heartbeat_rx.recv().await {
            debug!(
                activity = beat.activity,
                stage = %beat.stage,
                detail = beat.detail.as_deref(),
                "Activity progress"
            );
        }
    });

    let services = ActivityServices {
        store,
        generator,
        index,
        bucket,
        context: ActivityContext::new(heartbeat_tx, shutdown_rx.clone()),
    };
    info!("Activity services constructed, worker ready");

    wait_for_shutdown(shutdown_rx).await;

    info!(bucket = services.bucket, "Pipeline worker stopped");
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}
