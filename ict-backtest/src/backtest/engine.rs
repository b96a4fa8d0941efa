//! Backtest engine: one run from request to report.

use chrono::NaiveDate;
use ict_common::config::BacktestServiceConfig;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use super::executor::{ExecutorOptions, SkippedSignal, TradeExecutor};
use super::metrics::{PerformanceReport, Trade};
use crate::data::{first_unordered, Bar, LookbackPeriod, SignalSource, Timeframe};
use crate::error::BacktestError;

/// Message returned when the date range selects no bars
pub const NO_DATA_MESSAGE: &str = "No data available for the specified date range";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Engine configuration shared by every run
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// History requested from the source, counted back from its latest bar
    pub lookback: LookbackPeriod,
    /// Allow a signal to open while an earlier trade is still running
    pub allow_overlapping: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            lookback: LookbackPeriod::Span(chrono::Duration::days(2 * 365)),
            allow_overlapping: true,
        }
    }
}

impl BacktestConfig {
    /// Build from the service configuration section
    pub fn from_service(config: &BacktestServiceConfig) -> anyhow::Result<Self> {
        let lookback = config
            .lookback_period
            .parse::<LookbackPeriod>()
            .map_err(|e| anyhow::anyhow!("Invalid lookback_period: {}", e))?;

        Ok(Self {
            lookback,
            allow_overlapping: config.allow_overlapping_trades,
        })
    }
}

fn default_initial_capital() -> f64 {
    10_000.0
}

fn default_risk_per_trade() -> f64 {
    1.0
}

fn default_timeframe() -> String {
    "1h".to_string()
}

/// Parameters of one backtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub strategy: String,
    /// First day included, `YYYY-MM-DD`
    pub start_date: String,
    /// Last day included, `YYYY-MM-DD`
    pub end_date: String,
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Percent of current capital risked per trade
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade: f64,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

/// A request whose fields have been checked and parsed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParameters {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub timeframe: Timeframe,
    pub initial_capital: f64,
    pub risk_per_trade: f64,
}

impl BacktestRequest {
    /// Check every field, reporting the first problem found.
    pub fn validate(&self) -> Result<RunParameters, BacktestError> {
        if self.symbol.trim().is_empty() {
            return Err(BacktestError::InvalidRequest("symbol must not be empty".into()));
        }
        if self.strategy.trim().is_empty() {
            return Err(BacktestError::InvalidRequest("strategy must not be empty".into()));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::InvalidRequest(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !self.risk_per_trade.is_finite() || self.risk_per_trade <= 0.0 {
            return Err(BacktestError::InvalidRequest(format!(
                "risk_per_trade must be positive, got {}",
                self.risk_per_trade
            )));
        }

        let start = parse_date("start_date", &self.start_date)?;
        let end = parse_date("end_date", &self.end_date)?;
        let timeframe = self
            .timeframe
            .parse::<Timeframe>()
            .map_err(BacktestError::InvalidRequest)?;

        Ok(RunParameters {
            start,
            end,
            timeframe,
            initial_capital: self.initial_capital,
            risk_per_trade: self.risk_per_trade,
        })
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, BacktestError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        BacktestError::InvalidRequest(format!("{} must be YYYY-MM-DD, got '{}'", field, value))
    })
}

/// Keep bars whose UTC date lies in `[start, end]`.
pub fn filter_date_range(bars: Vec<Bar>, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    bars.into_iter()
        .filter(|bar| {
            let date = bar.timestamp.date_naive();
            date >= start && date <= end
        })
        .collect()
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    /// Run identifier, also attached to the run's log span
    pub run_id: Uuid,
    /// Performance statistics
    pub report: PerformanceReport,
    /// Every executed trade, in execution order
    pub trades: Vec<Trade>,
    /// Signals that did not produce a trade
    pub skipped: Vec<SkippedSignal>,
    /// Bars inside the date range
    pub bars_used: usize,
    /// Signal records handed to the executor
    pub signals_evaluated: usize,
}

/// Backtest engine
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    /// Create a new backtest engine
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Engine configuration
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run one backtest against `source`.
    pub async fn run(
        &self,
        source: &dyn SignalSource,
        request: &BacktestRequest,
    ) -> Result<BacktestResult, BacktestError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "backtest",
            %run_id,
            symbol = %request.symbol,
            strategy = %request.strategy,
            source = source.name(),
        );

        self.run_inner(run_id, source, request).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        source: &dyn SignalSource,
        request: &BacktestRequest,
    ) -> Result<BacktestResult, BacktestError> {
        let params = request.validate()?;
        let started = std::time::Instant::now();

        let bars = source
            .get_historical_bars(&request.symbol, self.config.lookback, params.timeframe)
            .await?;

        if let Some(index) = first_unordered(&bars) {
            return Err(BacktestError::MisalignedData { index });
        }

        let fetched = bars.len();
        let bars = filter_date_range(bars, params.start, params.end);
        if bars.is_empty() {
            return Err(BacktestError::NoData(NO_DATA_MESSAGE.to_string()));
        }
        tracing::debug!(fetched, in_range = bars.len(), "Bars selected");

        let records = source
            .signal_records(&request.symbol, &request.strategy)
            .await?;

        let execution = TradeExecutor::new(&bars, params.risk_per_trade)
            .with_options(ExecutorOptions {
                allow_overlapping: self.config.allow_overlapping,
            })
            .execute_records(&records, params.initial_capital);

        let report = PerformanceReport::summarize(
            &execution.trades,
            &execution.equity_curve,
            params.initial_capital,
            execution.final_capital,
        );

        tracing::info!(
            signals = records.len(),
            trades = report.total_trades,
            skipped = execution.skipped.len(),
            win_rate = report.win_rate,
            total_return = report.total_return,
            final_capital = report.final_capital,
            duration_ms = started.elapsed().as_millis() as u64,
            "Backtest completed"
        );

        Ok(BacktestResult {
            run_id,
            report,
            trades: execution.trades,
            skipped: execution.skipped,
            bars_used: bars.len(),
            signals_evaluated: records.len(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
