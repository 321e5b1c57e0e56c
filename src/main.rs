use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use model_manager::catalog::ModelCatalog;
use model_manager::config;
use model_manager::operation::{ActionGate, OperationTracker};
use model_manager::transfer::HttpDownloader;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "model_manager=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    let catalog = Arc::new(ModelCatalog::new(&app_config.catalog)?);
    // Keep serving with an empty catalog; clients can retry via /load_configs
    // 加载失败时以空目录启动，客户端可通过 /load_configs 重试
    if let Err(e) = catalog.reload().await {
        tracing::error!("{}", e);
    }

    let downloader = Arc::new(HttpDownloader::new(&app_config.transfer)?);
    let gate = ActionGate::new(OperationTracker::new(), catalog.clone(), downloader);

    let bind_addr = app_config.get_bind_address();
    let state = Arc::new(AppState::new(app_config, catalog, gate));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
