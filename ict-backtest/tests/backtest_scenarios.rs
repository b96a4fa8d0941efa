//! Backtest scenarios and properties over the public API.
//!
//! Hand-built bar series check exit resolution and statistics; proptest
//! covers capital bookkeeping over random series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use ict_backtest::backtest::{
    execute, max_drawdown, BacktestEngine, BacktestRequest, EquityPoint, ExitReason,
    PerformanceReport, SkipReason, Trade,
};
use ict_backtest::data::{Bar, JsonFileSource};
use ict_backtest::strategy::{Signal, SignalDirection};

// ============================================================================
// Test Data Generators
// ============================================================================

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
}

fn hour(n: i64) -> DateTime<Utc> {
    start() + Duration::hours(n)
}

fn signal_at(n: i64, direction: SignalDirection, entry: f64, stop: f64, target: f64) -> Signal {
    Signal {
        timestamp: hour(n),
        symbol: "EURUSD".to_string(),
        direction,
        entry_price: entry,
        stop_loss: stop,
        take_profit: target,
        strategy_tag: "silver_bullet".to_string(),
        confidence: 0.75,
        risk_reward_ratio: 2.0,
        concepts_used: vec!["fair_value_gap".to_string()],
    }
}

fn trade_with_pnl(pnl: f64) -> Trade {
    Trade {
        entry_time: hour(0),
        exit_time: hour(1),
        symbol: "EURUSD".to_string(),
        direction: SignalDirection::Long,
        entry_price: 1.0,
        exit_price: 1.0,
        position_size: 1.0,
        pnl,
        exit_reason: ExitReason::TimeExit,
        strategy_tag: "ote".to_string(),
    }
}

fn curve_for(trades: &[Trade], initial: f64) -> Vec<EquityPoint> {
    let mut equity = initial;
    trades
        .iter()
        .map(|t| {
            equity += t.pnl;
            EquityPoint {
                timestamp: t.exit_time,
                equity,
            }
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_stop_checked_before_target_on_same_bar() {
    let bars = vec![
        Bar::new(hour(0), 100.0, 100.5, 99.5, 100.0),
        Bar::new(hour(1), 100.0, 112.0, 94.0, 101.0),
        Bar::new(hour(2), 101.0, 102.0, 100.0, 101.0),
    ];
    let signals = vec![signal_at(0, SignalDirection::Long, 100.0, 95.0, 110.0)];

    let result = execute(&bars, &signals, 10_000.0, 1.0);

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].exit_price, 95.0);
    assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
    assert_eq!(result.trades[0].exit_time, hour(1));
}

#[test]
fn test_untouched_levels_exit_at_last_close() {
    let bars = vec![
        Bar::new(hour(0), 100.0, 101.0, 99.0, 100.0),
        Bar::new(hour(1), 100.0, 103.0, 98.0, 102.0),
        Bar::new(hour(2), 102.0, 106.0, 101.0, 105.0),
    ];
    let signals = vec![signal_at(0, SignalDirection::Long, 100.0, 90.0, 120.0)];

    let result = execute(&bars, &signals, 10_000.0, 1.0);

    assert_eq!(result.trades[0].exit_price, 105.0);
    assert_eq!(result.trades[0].exit_reason, ExitReason::TimeExit);
    assert_eq!(result.trades[0].exit_time, hour(2));
}

#[test]
fn test_signal_between_bars_is_skipped() {
    let bars: Vec<Bar> = (0..4)
        .map(|n| Bar::new(hour(n), 100.0, 101.0, 99.0, 100.0))
        .collect();
    let mut signal = signal_at(1, SignalDirection::Short, 100.0, 105.0, 90.0);
    signal.timestamp = hour(1) + Duration::minutes(15);

    let result = execute(&bars, &[signal], 10_000.0, 1.0);

    assert!(result.trades.is_empty());
    assert!(result.equity_curve.is_empty());
    assert_eq!(result.final_capital, 10_000.0);
    assert_eq!(result.skipped[0].reason, SkipReason::NoMatchingBar);
}

#[test]
fn test_win_rate_with_six_of_ten_winners() {
    let pnls = [100.0, -50.0, 100.0, -50.0, 100.0, -50.0, 100.0, -50.0, 100.0, 100.0];
    let trades: Vec<Trade> = pnls.iter().map(|&p| trade_with_pnl(p)).collect();
    let curve = curve_for(&trades, 10_000.0);
    let final_capital = curve.last().map(|p| p.equity).unwrap();

    let report = PerformanceReport::summarize(&trades, &curve, 10_000.0, final_capital);

    assert_eq!(report.win_rate, 60.0);
    assert_eq!(report.winning_trades, 6);
    assert_eq!(report.losing_trades, 4);
    // 600 won / 200 lost
    assert!((report.profit_factor - 3.0).abs() < 1e-12);
}

#[test]
fn test_no_trades_report_is_neutral() {
    let report = PerformanceReport::summarize(&[], &[], 10_000.0, 10_000.0);

    assert_eq!(report.total_trades, 0);
    assert_eq!(report.win_rate, 0.0);
    assert_eq!(report.total_return, 0.0);
    assert_eq!(report.max_drawdown, 0.0);
    assert_eq!(report.sharpe_ratio, 0.0);
    assert_eq!(report.profit_factor, 0.0);
    assert_eq!(report.final_capital, 10_000.0);
}

#[test]
fn test_only_winners_has_zero_profit_factor() {
    let trades = vec![trade_with_pnl(120.0), trade_with_pnl(80.0)];
    let curve = curve_for(&trades, 10_000.0);

    let report = PerformanceReport::summarize(&trades, &curve, 10_000.0, 10_200.0);

    assert_eq!(report.profit_factor, 0.0);
    assert_eq!(report.max_drawdown, 0.0);
}

#[tokio::test]
async fn test_end_to_end_from_json_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("bars")).unwrap();
    std::fs::create_dir_all(dir.path().join("signals")).unwrap();

    let bars: Vec<Bar> = vec![
        Bar::new(hour(0), 1.1000, 1.1010, 1.0990, 1.1000),
        Bar::new(hour(1), 1.1000, 1.1020, 1.0995, 1.1015),
        Bar::new(hour(2), 1.1015, 1.1060, 1.1010, 1.1050),
        Bar::new(hour(3), 1.1050, 1.1055, 1.1030, 1.1040),
    ];
    std::fs::write(
        dir.path().join("bars/EURUSD_1h.json"),
        serde_json::to_string(&bars).unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("signals/EURUSD_silver_bullet.json"),
        r#"[{"timestamp": "2024-03-04T00:00:00", "symbol": "EURUSD", "signal_type": "BUY",
             "entry_price": 1.1000, "stop_loss": 1.0980, "take_profit": 1.1040,
             "strategy": "silver_bullet", "confidence": 0.8, "risk_reward_ratio": 2.0}]"#,
    )
    .unwrap();

    let source = JsonFileSource::new(dir.path());
    let request = BacktestRequest {
        symbol: "EURUSD".to_string(),
        strategy: "silver_bullet".to_string(),
        start_date: "2024-03-01".to_string(),
        end_date: "2024-03-31".to_string(),
        initial_capital: 10_000.0,
        risk_per_trade: 1.0,
        timeframe: "1h".to_string(),
    };

    let result = BacktestEngine::default().run(&source, &request).await.unwrap();

    assert_eq!(result.report.total_trades, 1);
    assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
    assert_eq!(result.trades[0].exit_time, hour(2));
    assert!(result.report.final_capital > 10_000.0);
    assert_eq!(result.report.win_rate, 100.0);
}

fn json_file_fixture(signals: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("bars")).unwrap();
    std::fs::create_dir_all(dir.path().join("signals")).unwrap();

    let bars: Vec<Bar> = vec![
        Bar::new(hour(0), 1.1000, 1.1010, 1.0990, 1.1000),
        Bar::new(hour(1), 1.1000, 1.1020, 1.0995, 1.1015),
        Bar::new(hour(2), 1.1015, 1.1060, 1.1010, 1.1050),
        Bar::new(hour(3), 1.1050, 1.1055, 1.1030, 1.1040),
    ];
    std::fs::write(
        dir.path().join("bars/EURUSD_1h.json"),
        serde_json::to_string(&bars).unwrap(),
    )
    .unwrap();
    std::fs::write(dir.path().join("signals/EURUSD_silver_bullet.json"), signals).unwrap();
    dir
}

fn march_request(strategy: &str) -> BacktestRequest {
    BacktestRequest {
        symbol: "EURUSD".to_string(),
        strategy: strategy.to_string(),
        start_date: "2024-03-01".to_string(),
        end_date: "2024-03-31".to_string(),
        initial_capital: 10_000.0,
        risk_per_trade: 1.0,
        timeframe: "1h".to_string(),
    }
}

#[tokio::test]
async fn test_bad_record_in_signal_file_is_skipped_not_fatal() {
    let dir = json_file_fixture(
        r#"[{"timestamp": "2024-03-04T00:00:00", "symbol": "EURUSD", "signal_type": "BUY",
             "entry_price": 1.1000, "stop_loss": 1.0980, "take_profit": 1.1040,
             "strategy": "silver_bullet", "confidence": 0.8, "risk_reward_ratio": 2.0},
            {"timestamp": "2024-03-04T01:00:00", "symbol": "EURUSD", "signal_type": "BUY",
             "entry_price": null, "stop_loss": 1.0980, "take_profit": 1.1040,
             "strategy": "silver_bullet", "confidence": 0.8, "risk_reward_ratio": 2.0},
            {"timestamp": "2024-03-04T01:00:00", "symbol": "EURUSD", "signal_type": "BUY",
             "entry_price": 1.1015, "stop_loss": 1.0990, "take_profit": 1.1050,
             "strategy": "silver_bullet", "confidence": 0.7, "risk_reward_ratio": 1.4}]"#,
    );
    let source = JsonFileSource::new(dir.path());

    let result = BacktestEngine::default()
        .run(&source, &march_request("silver_bullet"))
        .await
        .unwrap();

    assert_eq!(result.signals_evaluated, 3);
    assert_eq!(result.report.total_trades, 2);
    assert_eq!(result.trades[0].entry_time, hour(0));
    assert_eq!(result.trades[1].entry_time, hour(1));
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].index, 1);
    assert_eq!(result.skipped[0].timestamp, Some(hour(1)));
    assert_eq!(result.skipped[0].reason, SkipReason::MalformedSignal);
}

#[tokio::test]
async fn test_strategy_without_signal_file_completes_flat() {
    let dir = json_file_fixture("[]");
    let source = JsonFileSource::new(dir.path());

    let result = BacktestEngine::default()
        .run(&source, &march_request("judas_swing"))
        .await
        .unwrap();

    assert_eq!(result.report.total_trades, 0);
    assert!(result.skipped.is_empty());
    assert_eq!(result.report.final_capital, 10_000.0);
}

// ============================================================================
// Properties
// ============================================================================

/// (close, up wick, down wick) per bar
fn bar_series() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((50.0f64..150.0, 0.0f64..5.0, 0.0f64..5.0), 2..60)
}

/// (bar offset, long?, stop distance, reward multiple)
fn signal_specs() -> impl Strategy<Value = Vec<(usize, bool, f64, f64)>> {
    prop::collection::vec((0usize..60, any::<bool>(), 0.1f64..8.0, 0.5f64..4.0), 0..25)
}

fn build_bars(series: &[(f64, f64, f64)]) -> Vec<Bar> {
    series
        .iter()
        .enumerate()
        .map(|(i, &(close, up, down))| {
            Bar::new(hour(i as i64), close, close + up, close - down, close)
        })
        .collect()
}

fn build_signals(bars: &[Bar], specs: &[(usize, bool, f64, f64)]) -> Vec<Signal> {
    specs
        .iter()
        .map(|&(offset, is_long, distance, reward)| {
            let bar = &bars[offset % bars.len()];
            let entry = bar.close;
            let (direction, stop, target) = if is_long {
                (SignalDirection::Long, entry - distance, entry + distance * reward)
            } else {
                (SignalDirection::Short, entry + distance, entry - distance * reward)
            };
            let mut signal = signal_at(0, direction, entry, stop, target);
            signal.timestamp = bar.timestamp;
            signal
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn capital_is_initial_plus_every_pnl(
        series in bar_series(),
        specs in signal_specs(),
        risk in 0.1f64..5.0,
    ) {
        let bars = build_bars(&series);
        let signals = build_signals(&bars, &specs);

        let result = execute(&bars, &signals, 10_000.0, risk);

        let folded = result.trades.iter().fold(10_000.0, |c, t| c + t.pnl);
        prop_assert_eq!(result.final_capital, folded);
        prop_assert_eq!(result.trades.len(), result.equity_curve.len());
        prop_assert_eq!(result.trades.len() + result.skipped.len(), signals.len());

        let mut capital = 10_000.0;
        for (trade, point) in result.trades.iter().zip(&result.equity_curve) {
            capital += trade.pnl;
            prop_assert_eq!(point.equity, capital);
            prop_assert_eq!(point.timestamp, trade.exit_time);
            prop_assert!(trade.exit_time > trade.entry_time);
        }
    }

    #[test]
    fn losses_never_exceed_the_risked_amount(
        series in bar_series(),
        specs in signal_specs(),
        risk in 0.1f64..5.0,
    ) {
        let bars = build_bars(&series);
        let signals = build_signals(&bars, &specs);

        let result = execute(&bars, &signals, 10_000.0, risk);

        let mut capital = 10_000.0;
        for trade in &result.trades {
            let risked = capital * risk / 100.0;
            prop_assert!(trade.pnl >= -risked * (1.0 + 1e-9));
            capital += trade.pnl;
        }
        prop_assert!(result.final_capital > 0.0);
    }

    #[test]
    fn drawdown_tracks_a_rising_peak(pnls in prop::collection::vec(-500.0f64..500.0, 0..80)) {
        let trades: Vec<Trade> = pnls.iter().map(|&p| trade_with_pnl(p)).collect();
        let curve = curve_for(&trades, 10_000.0);

        let mut peak = 10_000.0f64;
        let mut worst = 0.0f64;
        for point in &curve {
            let previous = peak;
            peak = peak.max(point.equity);
            prop_assert!(peak >= previous);
            worst = worst.max((peak - point.equity) / peak * 100.0);
        }

        let drawdown = max_drawdown(&curve, 10_000.0);
        prop_assert!(drawdown >= 0.0);
        prop_assert!((drawdown - worst).abs() < 1e-9);
    }
}
