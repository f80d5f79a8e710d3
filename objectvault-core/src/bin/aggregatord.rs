// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Aggregator daemon: encryption, chunking, CRC, metadata, and the HTTP
//! surface the load balancer forwards to (§4.6-4.8, §6).

use std::sync::Arc;

use objectvault_bootstrap::{install_signal_handler, CommonArgs, ShutdownCoordinator};
use objectvault_core::application::aggregator_api::{self, AggregatorApiState};
use objectvault_core::application::aggregator_pipeline::AggregatorPipeline;
use objectvault_core::infrastructure::backend::{BackendPool, SftpClient, SftpCredentials};
use objectvault_core::infrastructure::config::{AggregatorConfig, CommonConfig};
use objectvault_core::infrastructure::crypto::AesGcmEngine;
use objectvault_core::infrastructure::integrity::Crc32Engine;
use objectvault_core::infrastructure::metadata::{connect_with_retry, MetadataStoreConfig, SqliteMetadataStore};
use objectvault_core::infrastructure::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CommonArgs::parse_args();
    objectvault_bootstrap::logger::init_tracing(args.log_level.as_deref().unwrap_or("info"));

    let common = CommonConfig::load()?;
    let aggregator = AggregatorConfig::load()?;

    let metadata_config = MetadataStoreConfig {
        database_url: common.database_url.clone(),
        reset_schema: args.reset_schema || common.reset_schema,
        startup_retry_attempts: common.startup_retry_attempts,
        startup_retry_delay: common.startup_retry_delay(),
        ..Default::default()
    };
    let pool = connect_with_retry(&metadata_config).await?;
    let metadata: Arc<dyn objectvault_domain::repositories::MetadataStore> = Arc::new(SqliteMetadataStore::new(pool));

    let key = common.decoded_key()?;
    let crypto = Arc::new(AesGcmEngine::new(&key)?);
    let integrity = Arc::new(Crc32Engine);

    let metrics = Arc::new(Metrics::new());

    let endpoints = aggregator.endpoints();
    let backend_pool = Arc::new(BackendPool::new(endpoints, aggregator.permit_count_per_backend, metrics.clone()));
    let backend_client = Arc::new(SftpClient::new(SftpCredentials {
        username: aggregator.sftp_username.clone(),
        password: aggregator.sftp_password.clone(),
        port: aggregator.sftp_port,
    }));

    let pipeline = Arc::new(AggregatorPipeline::new(
        metadata.clone(),
        crypto,
        integrity,
        backend_pool,
        backend_client,
        metrics.clone(),
        aggregator.upload_concurrency,
        aggregator.chunk_size_bytes,
        aggregator.max_file_size_bytes,
        aggregator.storage_root.clone(),
    ));

    let coordinator = ShutdownCoordinator::default();
    install_signal_handler(coordinator.clone()).await;

    let state = AggregatorApiState {
        pipeline,
        metadata,
        metrics,
        shutdown: coordinator.token(),
    };
    let app = aggregator_api::router(state);

    let addr = format!("0.0.0.0:{}", aggregator.http_port);
    tracing::info!(%addr, "aggregator listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let token = coordinator.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    Ok(())
}
