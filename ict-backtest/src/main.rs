//! ict-backtest service entry point.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use ict_backtest::{build_router, AppState, BacktestConfig, BacktestEngine, JsonFileSource};
use ict_common::config::Config;
use ict_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    let config = Config::load_and_validate()?;
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("ICT Backtest v{}", env!("CARGO_PKG_VERSION"));

    let service = config.backtest.clone();
    let engine = BacktestEngine::new(BacktestConfig::from_service(&service)?);
    let source = Arc::new(JsonFileSource::new(&service.data_dir));
    tracing::info!(
        data_dir = %service.data_dir.display(),
        lookback = %service.lookback_period,
        allow_overlapping = service.allow_overlapping_trades,
        "Signal source ready"
    );

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address()))?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(AppState::new(source, engine, service)).layer(cors);

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
