//! Backtest report payloads returned by the API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::engine::{BacktestRequest, BacktestResult};
use super::executor::SkippedSignal;
use super::metrics::PerformanceReport;

/// Response for a completed run
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResponse {
    /// Identifier of the run, matching its log span
    pub run_id: Uuid,
    /// The request as executed, defaults filled in
    pub request: BacktestRequest,
    /// Performance statistics
    pub results: PerformanceReport,
    /// Signals that produced no trade
    pub skipped_signals: Vec<SkippedSignal>,
    /// Bars inside the date range
    pub bars_used: usize,
    /// Signal records read from the source
    pub signals_evaluated: usize,
    pub status: String,
}

impl BacktestResponse {
    /// Wrap a finished run
    pub fn completed(request: BacktestRequest, result: BacktestResult) -> Self {
        Self {
            run_id: result.run_id,
            request,
            results: result.report,
            skipped_signals: result.skipped,
            bars_used: result.bars_used,
            signals_evaluated: result.signals_evaluated,
            status: "completed".to_string(),
        }
    }
}

/// Headline statistics without trade detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub final_capital: f64,
}

impl From<&PerformanceReport> for ReportSummary {
    fn from(report: &PerformanceReport) -> Self {
        Self {
            total_trades: report.total_trades,
            winning_trades: report.winning_trades,
            losing_trades: report.losing_trades,
            win_rate: report.win_rate,
            total_return: report.total_return,
            max_drawdown: report.max_drawdown,
            sharpe_ratio: report.sharpe_ratio,
            profit_factor: report.profit_factor,
            final_capital: report.final_capital,
        }
    }
}

/// Static demonstration report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleReport {
    pub symbol: String,
    pub strategy: String,
    pub period: String,
    pub results: ReportSummary,
    pub status: String,
}

impl ExampleReport {
    /// A fixed EURUSD silver bullet report for demos
    pub fn silver_bullet() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            strategy: "silver_bullet".to_string(),
            period: "2023-01-01 to 2023-12-31".to_string(),
            results: ReportSummary {
                total_trades: 156,
                winning_trades: 94,
                losing_trades: 62,
                win_rate: 60.26,
                total_return: 23.5,
                max_drawdown: 8.2,
                sharpe_ratio: 1.42,
                profit_factor: 1.85,
                final_capital: 12_350.0,
            },
            status: "example".to_string(),
        }
    }
}
