//! Trade records and backtest performance metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::strategy::SignalDirection;

/// Number of most recent trades carried in a report
pub const MAX_REPORT_TRADES: usize = 20;

/// Trading periods per year used to annualize the Sharpe ratio
pub const ANNUALIZATION_PERIODS: f64 = 252.0;

/// Why a trade was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Price touched the stop-loss level
    StopLoss,
    /// Price touched the take-profit level
    TakeProfit,
    /// Neither level was touched before the data ran out
    TimeExit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "stop_loss"),
            Self::TakeProfit => write!(f, "take_profit"),
            Self::TimeExit => write!(f, "time_exit"),
        }
    }
}

/// Realized outcome of one executed signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Signal bar time
    pub entry_time: DateTime<Utc>,
    /// Time of the bar the exit was resolved on
    pub exit_time: DateTime<Utc>,
    /// Symbol traded
    pub symbol: String,
    /// Long or short
    pub direction: SignalDirection,
    /// Entry price
    pub entry_price: f64,
    /// Exit price
    pub exit_price: f64,
    /// Units traded
    pub position_size: f64,
    /// Realized P&L
    pub pnl: f64,
    /// Exit reason
    pub exit_reason: ExitReason,
    /// Strategy that produced the signal
    pub strategy_tag: String,
}

impl Trade {
    /// Check if trade was profitable
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Check if trade lost money
    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }

}

/// Equity snapshot taken at a trade exit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Backtest performance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Total number of trades
    pub total_trades: usize,
    /// Trades with positive P&L
    pub winning_trades: usize,
    /// Trades with negative P&L
    pub losing_trades: usize,
    /// Win rate (percentage)
    pub win_rate: f64,
    /// Total return (percentage of initial capital)
    pub total_return: f64,
    /// Maximum peak-to-trough equity decline (percentage)
    pub max_drawdown: f64,
    /// Sharpe ratio (per-trade returns, annualized, risk-free rate = 0)
    pub sharpe_ratio: f64,
    /// Gross profit / gross loss, 0 when nothing was lost
    pub profit_factor: f64,
    /// Capital after the last trade
    pub final_capital: f64,
    /// Most recent trades, oldest first
    pub trades: Vec<Trade>,
    /// Full equity curve
    pub equity_curve: Vec<EquityPoint>,
}

impl PerformanceReport {
    /// Derive performance statistics from a completed trade log.
    pub fn summarize(
        trades: &[Trade],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
        current_capital: f64,
    ) -> Self {
        let total_trades = trades.len();

        if total_trades == 0 {
            return Self::empty(current_capital, equity_curve.to_vec());
        }

        let winning_trades = trades.iter().filter(|t| t.is_winner()).count();
        let losing_trades = trades.iter().filter(|t| t.is_loser()).count();
        let win_rate = (winning_trades as f64 / total_trades as f64) * 100.0;

        let total_return = ((current_capital - initial_capital) / initial_capital) * 100.0;

        let max_drawdown = max_drawdown(equity_curve, initial_capital);
        let profit_factor = profit_factor(trades);

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl / initial_capital).collect();
        let sharpe_ratio = sharpe_ratio(&returns);

        let recent_start = total_trades.saturating_sub(MAX_REPORT_TRADES);

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_return,
            max_drawdown,
            sharpe_ratio,
            profit_factor,
            final_capital: current_capital,
            trades: trades[recent_start..].to_vec(),
            equity_curve: equity_curve.to_vec(),
        }
    }

    /// Zeroed report for a run without trades
    fn empty(final_capital: f64, equity_curve: Vec<EquityPoint>) -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            total_return: 0.0,
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
            profit_factor: 0.0,
            final_capital,
            trades: Vec::new(),
            equity_curve,
        }
    }
}

/// Largest percentage decline from the running equity peak.
///
/// The peak starts at `initial_capital` and only ever rises.
pub fn max_drawdown(equity_curve: &[EquityPoint], initial_capital: f64) -> f64 {
    let mut peak = initial_capital;
    let mut max_drawdown = 0.0;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }

        let drawdown = ((peak - point.equity) / peak) * 100.0;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }

    max_drawdown
}

/// Gross profit over gross loss; 0 when there is no loss.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl)
        .sum::<f64>()
        .abs();

    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else {
        0.0
    }
}

/// Mean over population standard deviation of per-trade returns, scaled by
/// sqrt(252). Zero for fewer than two returns or zero variance.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    // Identical returns can leave rounding residue in the deviation
    if returns.iter().all(|r| *r == returns[0]) {
        return 0.0;
    }

    let mean = returns.iter().mean();
    let std_dev = returns.iter().population_std_dev();

    if std_dev > f64::EPSILON * mean.abs() {
        (mean / std_dev) * ANNUALIZATION_PERIODS.sqrt()
    } else {
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================
