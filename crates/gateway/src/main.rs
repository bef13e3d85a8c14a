//! # XeroQ Gateway
//!
//! 環境変数から設定を読み込み、選択されたストレージバックエンドでHTTPサーバーを起動する。

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use xeroq_core::LifecycleService;
use xeroq_gateway::config::{GatewayConfig, GatewayState};
use xeroq_gateway::storage::build_stores;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    let (jobs, blobs) = build_stores(config.storage_backend)?;

    let lifecycle = LifecycleService::new(jobs, blobs)
        .with_content_policy(config.content_policy)
        .with_retention(config.retention);

    tracing::info!(
        backend = ?config.storage_backend,
        max_document_bytes = config.content_policy.max_bytes(xeroq_core::FileKind::Document),
        max_image_bytes = config.content_policy.max_bytes(xeroq_core::FileKind::Image),
        retention_secs = config.retention.window().num_seconds(),
        "Gateway設定を読み込みました"
    );

    let state = Arc::new(GatewayState { lifecycle });
    let app = xeroq_gateway::build_router(state, &config.cors_origins)?;

    tracing::info!("Gatewayを {} で起動します", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
