//! Integration tests for the backtesting HTTP API.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tower::ServiceExt;

use ict_backtest::data::{Bar, InMemorySource, LookbackPeriod, SignalSource, SourceError, Timeframe};
use ict_backtest::strategy::{Signal, SignalDirection};
use ict_backtest::{build_router, AppState, BacktestEngine};
use ict_common::config::BacktestServiceConfig;

fn hour(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap() + Duration::hours(n)
}

fn signal(n: i64, entry: f64, stop: f64, target: f64) -> Signal {
    Signal {
        timestamp: hour(n),
        symbol: "EURUSD".to_string(),
        direction: SignalDirection::Long,
        entry_price: entry,
        stop_loss: stop,
        take_profit: target,
        strategy_tag: "silver_bullet".to_string(),
        confidence: 0.8,
        risk_reward_ratio: 2.0,
        concepts_used: Vec::new(),
    }
}

fn fixture_source() -> InMemorySource {
    let bars = vec![
        Bar::new(hour(0), 100.0, 100.5, 99.5, 100.0),
        Bar::new(hour(1), 100.0, 104.0, 99.0, 103.0),
        Bar::new(hour(2), 103.0, 111.0, 102.0, 110.0),
        Bar::new(hour(3), 110.0, 110.5, 104.0, 105.0),
        Bar::new(hour(4), 105.0, 106.0, 104.5, 105.5),
    ];
    let signals = vec![
        signal(0, 100.0, 95.0, 110.0),
        signal(3, 105.0, 103.0, 115.0),
        signal(4, 105.5, 104.0, 108.5),
    ];

    InMemorySource::new()
        .with_bars("EURUSD", Timeframe::H1, bars)
        .with_signals("EURUSD", "silver_bullet", signals)
}

fn app_with(source: Arc<dyn SignalSource>, config: BacktestServiceConfig) -> axum::Router {
    build_router(AppState::new(source, BacktestEngine::default(), config))
}

fn test_app() -> axum::Router {
    app_with(Arc::new(fixture_source()), BacktestServiceConfig::default())
}

fn run_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/backtesting/run")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_run_backtest_completed() {
    let response = test_app()
        .oneshot(run_request(
            r#"{"symbol": "EURUSD", "strategy": "silver_bullet",
                "start_date": "2024-05-01", "end_date": "2024-05-31"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;

    assert_eq!(json["status"], "completed");
    assert!(json["run_id"].as_str().is_some_and(|id| id.len() == 36));
    assert_eq!(json["bars_used"], 5);
    assert_eq!(json["signals_evaluated"], 3);
    assert_eq!(json["request"]["initial_capital"], 10_000.0);
    assert_eq!(json["request"]["timeframe"], "1h");

    let results = &json["results"];
    assert_eq!(results["total_trades"], 2);
    assert_eq!(results["winning_trades"], 2);
    assert_eq!(results["trades"][0]["exit_reason"], "take_profit");
    assert_eq!(results["trades"][1]["exit_reason"], "time_exit");
    assert_eq!(results["equity_curve"].as_array().unwrap().len(), 2);

    let skipped = json["skipped_signals"].as_array().unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0]["index"], 2);
    assert_eq!(skipped[0]["reason"], "no_future_bars");
}

#[tokio::test]
async fn test_run_outside_data_range() {
    let response = test_app()
        .oneshot(run_request(
            r#"{"symbol": "EURUSD", "strategy": "silver_bullet",
                "start_date": "2022-01-01", "end_date": "2022-12-31"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NO_DATA");
    assert_eq!(
        json["error"]["message"],
        "No data available for the specified date range"
    );
}

#[tokio::test]
async fn test_run_unknown_symbol_is_not_found() {
    let response = test_app()
        .oneshot(run_request(
            r#"{"symbol": "XAUUSD", "strategy": "silver_bullet",
                "start_date": "2024-05-01", "end_date": "2024-05-31"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["error"]["code"], "DATA_NOT_FOUND");
}

#[tokio::test]
async fn test_run_invalid_parameters() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(run_request(
            r#"{"symbol": "EURUSD", "strategy": "silver_bullet", "start_date": "2024-05-01",
                "end_date": "2024-05-31", "risk_per_trade": -1.0}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(run_request(
            r#"{"symbol": "EURUSD", "strategy": "silver_bullet", "start_date": "2024-05-01",
                "end_date": "2024-05-31", "timeframe": "3h"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_example_endpoint() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api/backtesting/example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["symbol"], "EURUSD");
    assert_eq!(json["period"], "2023-01-01 to 2023-12-31");
    assert_eq!(json["results"]["win_rate"], 60.26);
    assert_eq!(json["status"], "example");
}

/// Source that never answers in time
struct StalledSource;

#[async_trait]
impl SignalSource for StalledSource {
    fn name(&self) -> &'static str {
        "stalled"
    }

    async fn get_historical_bars(
        &self,
        _symbol: &str,
        _lookback: LookbackPeriod,
        _interval: Timeframe,
    ) -> Result<Vec<Bar>, SourceError> {
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        Err(SourceError::Unavailable("stalled".to_string()))
    }

    async fn generate_signals(
        &self,
        _symbol: &str,
        _strategy: &str,
    ) -> Result<Vec<Signal>, SourceError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_run_times_out() {
    let config = BacktestServiceConfig {
        run_timeout_secs: 1,
        ..BacktestServiceConfig::default()
    };
    let app = app_with(Arc::new(StalledSource), config);

    let response = app
        .oneshot(run_request(
            r#"{"symbol": "EURUSD", "strategy": "silver_bullet",
                "start_date": "2024-05-01", "end_date": "2024-05-31"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(read_json(response).await["error"]["code"], "TIMEOUT");
}
