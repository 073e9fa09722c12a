//! Pipeline Worker Service - Entry Point
//!
//! Process shell that hosts the asset-publication and embedding activities.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pipeline_worker::run().await
}
