//! Signal backtesting.
//!
//! Replays externally generated signals over bar history with risk-based
//! position sizing, then reduces the trade log into performance statistics.

mod engine;
mod executor;
mod metrics;
mod report;

pub use engine::{
    filter_date_range, BacktestConfig, BacktestEngine, BacktestRequest, BacktestResult,
    RunParameters, NO_DATA_MESSAGE,
};
pub use executor::{
    execute, resolve_exit, Execution, ExecutionState, ExecutorOptions, ExitResolution,
    SignalOutcome, SkipReason, SkippedSignal, TradeExecutor,
};
pub use metrics::{
    max_drawdown, profit_factor, sharpe_ratio, EquityPoint, ExitReason, PerformanceReport, Trade,
    ANNUALIZATION_PERIODS, MAX_REPORT_TRADES,
};
pub use report::{BacktestResponse, ExampleReport, ReportSummary};
