//! Trade executor: replays signals over bar history.
//!
//! Signals are processed one at a time, in the order given. Each signal is
//! sized against the capital left by every earlier trade, so the replay is a
//! fold over the signal sequence with [`ExecutionState`] as the accumulator.
//!
//! A signal that cannot be simulated is skipped with a [`SkipReason`]; it
//! never aborts the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::metrics::{EquityPoint, ExitReason, Trade};
use crate::data::Bar;
use crate::strategy::{Signal, SignalDirection, SignalRecord};

/// Why a signal produced no trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Signal timestamp matches no bar
    NoMatchingBar,
    /// Entry equals stop, position size is undefined
    ZeroRiskDistance,
    /// Signal fires on the last bar
    NoFutureBars,
    /// Non-finite prices, or sizing/P&L came out non-finite
    MalformedSignal,
    /// Capital is exhausted
    DepletedCapital,
    /// Signal starts before the previous trade exited
    OverlappingPosition,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NoMatchingBar => "no_matching_bar",
            Self::ZeroRiskDistance => "zero_risk_distance",
            Self::NoFutureBars => "no_future_bars",
            Self::MalformedSignal => "malformed_signal",
            Self::DepletedCapital => "depleted_capital",
            Self::OverlappingPosition => "overlapping_position",
        };
        f.write_str(s)
    }
}

/// A signal that was not executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSignal {
    /// Position in the input signal sequence
    pub index: usize,
    /// Signal timestamp, absent for records without a readable one
    pub timestamp: Option<DateTime<Utc>>,
    /// Why it was skipped
    pub reason: SkipReason,
}

/// Result of evaluating one signal
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Executed(Trade),
    Skipped(SkipReason),
}

/// Executor behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// When false, a signal earlier than the previous trade's exit is skipped
    pub allow_overlapping: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            allow_overlapping: true,
        }
    }
}

/// Accumulator carried across signals
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState {
    /// Capital after all trades so far
    pub capital: f64,
    /// Executed trades, in processing order
    pub trades: Vec<Trade>,
    /// One point per trade, parallel to `trades`
    pub equity_curve: Vec<EquityPoint>,
    /// Signals that produced no trade
    pub skipped: Vec<SkippedSignal>,
}

impl ExecutionState {
    /// Fresh state for a run
    pub fn new(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn last_exit(&self) -> Option<DateTime<Utc>> {
        self.trades.last().map(|t| t.exit_time)
    }
}

/// Completed replay
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_capital: f64,
    pub skipped: Vec<SkippedSignal>,
}

impl From<ExecutionState> for Execution {
    fn from(state: ExecutionState) -> Self {
        Self {
            trades: state.trades,
            equity_curve: state.equity_curve,
            final_capital: state.capital,
            skipped: state.skipped,
        }
    }
}

/// Where and how a position was closed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitResolution {
    pub price: f64,
    pub reason: ExitReason,
    pub time: DateTime<Utc>,
}

/// Scan bars after entry for the first stop or target touch.
///
/// Stop-loss is checked before take-profit within a bar. Without a touch the
/// position closes at the last bar's close. Returns `None` for an empty window.
pub fn resolve_exit(
    direction: SignalDirection,
    stop_loss: f64,
    take_profit: f64,
    window: &[Bar],
) -> Option<ExitResolution> {
    let last = window.last()?;

    for bar in window {
        let (stop_hit, target_hit) = match direction {
            SignalDirection::Long => (bar.low <= stop_loss, bar.high >= take_profit),
            SignalDirection::Short => (bar.high >= stop_loss, bar.low <= take_profit),
        };

        if stop_hit {
            return Some(ExitResolution {
                price: stop_loss,
                reason: ExitReason::StopLoss,
                time: bar.timestamp,
            });
        }
        if target_hit {
            return Some(ExitResolution {
                price: take_profit,
                reason: ExitReason::TakeProfit,
                time: bar.timestamp,
            });
        }
    }

    Some(ExitResolution {
        price: last.close,
        reason: ExitReason::TimeExit,
        time: last.timestamp,
    })
}

/// Replays signals against one bar series.
#[derive(Debug, Clone)]
pub struct TradeExecutor<'a> {
    bars: &'a [Bar],
    index: HashMap<DateTime<Utc>, usize>,
    risk_per_trade_pct: f64,
    options: ExecutorOptions,
}

impl<'a> TradeExecutor<'a> {
    /// Create an executor over `bars` (ascending by timestamp).
    ///
    /// On duplicate timestamps the first bar wins.
    pub fn new(bars: &'a [Bar], risk_per_trade_pct: f64) -> Self {
        let mut index = HashMap::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            index.entry(bar.timestamp).or_insert(i);
        }

        Self {
            bars,
            index,
            risk_per_trade_pct,
            options: ExecutorOptions::default(),
        }
    }

    /// Override executor options
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Replay every signal, in order, starting from `initial_capital`.
    pub fn execute(&self, signals: &[Signal], initial_capital: f64) -> Execution {
        signals
            .iter()
            .enumerate()
            .fold(ExecutionState::new(initial_capital), |state, (i, signal)| {
                self.step(state, i, signal)
            })
            .into()
    }

    /// Replay a feed that may contain undecodable records.
    ///
    /// Malformed records are skipped in place, so skip indexes refer to the
    /// position in `records`.
    pub fn execute_records(&self, records: &[SignalRecord], initial_capital: f64) -> Execution {
        records
            .iter()
            .enumerate()
            .fold(ExecutionState::new(initial_capital), |state, (i, record)| {
                self.step_record(state, i, record)
            })
            .into()
    }

    /// Apply one feed record to the running state.
    pub fn step_record(
        &self,
        mut state: ExecutionState,
        index: usize,
        record: &SignalRecord,
    ) -> ExecutionState {
        match record {
            SignalRecord::Valid(signal) => self.step(state, index, signal),
            SignalRecord::Malformed { timestamp, reason } => {
                tracing::debug!(index, reason = %reason, "Malformed signal skipped");
                state.skipped.push(SkippedSignal {
                    index,
                    timestamp: *timestamp,
                    reason: SkipReason::MalformedSignal,
                });
                state
            }
        }
    }

    /// Apply one signal to the running state.
    pub fn step(&self, mut state: ExecutionState, index: usize, signal: &Signal) -> ExecutionState {
        match self.evaluate(signal, state.capital, state.last_exit()) {
            SignalOutcome::Executed(trade) => {
                state.capital += trade.pnl;
                state.equity_curve.push(EquityPoint {
                    timestamp: trade.exit_time,
                    equity: state.capital,
                });
                tracing::debug!(
                    index,
                    entry_time = %trade.entry_time,
                    exit_time = %trade.exit_time,
                    exit_reason = %trade.exit_reason,
                    pnl = trade.pnl,
                    capital = state.capital,
                    "Trade executed"
                );
                state.trades.push(trade);
            }
            SignalOutcome::Skipped(reason) => {
                tracing::debug!(
                    index,
                    timestamp = %signal.timestamp,
                    reason = %reason,
                    "Signal skipped"
                );
                state.skipped.push(SkippedSignal {
                    index,
                    timestamp: Some(signal.timestamp),
                    reason,
                });
            }
        }
        state
    }

    /// Simulate one signal against the given capital. Pure; no state changes.
    pub fn evaluate(
        &self,
        signal: &Signal,
        capital: f64,
        last_exit: Option<DateTime<Utc>>,
    ) -> SignalOutcome {
        if !signal.has_finite_levels() {
            return SignalOutcome::Skipped(SkipReason::MalformedSignal);
        }

        let Some(&position) = self.index.get(&signal.timestamp) else {
            return SignalOutcome::Skipped(SkipReason::NoMatchingBar);
        };

        let stop_distance = signal.risk_distance();
        if stop_distance == 0.0 {
            return SignalOutcome::Skipped(SkipReason::ZeroRiskDistance);
        }

        if !self.options.allow_overlapping {
            if let Some(exit) = last_exit {
                if signal.timestamp < exit {
                    return SignalOutcome::Skipped(SkipReason::OverlappingPosition);
                }
            }
        }

        if capital.is_nan() || capital <= 0.0 {
            return SignalOutcome::Skipped(SkipReason::DepletedCapital);
        }

        let risk_amount = capital * (self.risk_per_trade_pct / 100.0);
        let position_size = risk_amount / stop_distance;

        let window = &self.bars[position + 1..];
        let Some(exit) = resolve_exit(
            signal.direction,
            signal.stop_loss,
            signal.take_profit,
            window,
        ) else {
            return SignalOutcome::Skipped(SkipReason::NoFutureBars);
        };

        let pnl = match signal.direction {
            SignalDirection::Long => (exit.price - signal.entry_price) * position_size,
            SignalDirection::Short => (signal.entry_price - exit.price) * position_size,
        };

        if !position_size.is_finite() || !pnl.is_finite() {
            return SignalOutcome::Skipped(SkipReason::MalformedSignal);
        }

        SignalOutcome::Executed(Trade {
            entry_time: signal.timestamp,
            exit_time: exit.time,
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            entry_price: signal.entry_price,
            exit_price: exit.price,
            position_size,
            pnl,
            exit_reason: exit.reason,
            strategy_tag: signal.strategy_tag.clone(),
        })
    }
}

/// Replay `signals` over `bars` with default options.
pub fn execute(
    bars: &[Bar],
    signals: &[Signal],
    initial_capital: f64,
    risk_per_trade_pct: f64,
) -> Execution {
    TradeExecutor::new(bars, risk_per_trade_pct).execute(signals, initial_capital)
}

// ============================================================================
// Tests
// ============================================================================
