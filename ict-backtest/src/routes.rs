//! HTTP API routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use ict_common::config::BacktestServiceConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;

use crate::backtest::{BacktestEngine, BacktestRequest, BacktestResponse, ExampleReport};
use crate::data::SignalSource;
use crate::error::BacktestError;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn SignalSource>,
    pub engine: Arc<BacktestEngine>,
    pub config: Arc<BacktestServiceConfig>,
}

impl AppState {
    pub fn new(
        source: Arc<dyn SignalSource>,
        engine: BacktestEngine,
        config: BacktestServiceConfig,
    ) -> Self {
        Self {
            source,
            engine: Arc::new(engine),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/backtesting/run", post(run_backtest))
        .route("/api/backtesting/example", get(example_backtest))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

// ============ Health Check ============

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "ict-backtest",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============ Backtesting ============

/// Run request body; omitted fields take the service defaults.
#[derive(Debug, Deserialize)]
pub struct RunBacktestBody {
    pub symbol: String,
    pub strategy: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub initial_capital: Option<f64>,
    pub risk_per_trade: Option<f64>,
    pub timeframe: Option<String>,
}

impl RunBacktestBody {
    /// Fill missing fields from the service configuration
    pub fn into_request(self, defaults: &BacktestServiceConfig) -> BacktestRequest {
        BacktestRequest {
            symbol: self.symbol,
            strategy: self.strategy,
            start_date: self.start_date.unwrap_or_else(|| defaults.start_date.clone()),
            end_date: self.end_date.unwrap_or_else(|| defaults.end_date.clone()),
            initial_capital: self
                .initial_capital
                .unwrap_or(defaults.default_initial_capital),
            risk_per_trade: self.risk_per_trade.unwrap_or(defaults.default_risk_percent),
            timeframe: self
                .timeframe
                .unwrap_or_else(|| defaults.default_timeframe.clone()),
        }
    }
}

async fn run_backtest(
    State(state): State<AppState>,
    body: Result<Json<RunBacktestBody>, JsonRejection>,
) -> Result<Json<BacktestResponse>, BacktestError> {
    let Json(body) = body.map_err(|e| BacktestError::InvalidRequest(e.body_text()))?;
    let request = body.into_request(&state.config);

    let secs = state.config.run_timeout_secs;
    let run = state.engine.run(state.source.as_ref(), &request);
    let result = tokio::time::timeout(Duration::from_secs(secs), run)
        .await
        .map_err(|_| BacktestError::Timeout { secs })??;

    Ok(Json(BacktestResponse::completed(request, result)))
}

async fn example_backtest() -> Json<ExampleReport> {
    Json(ExampleReport::silver_bullet())
}
