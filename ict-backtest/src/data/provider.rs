//! Signal source abstraction.
//!
//! Signal generation lives outside this service. The backtest only needs two
//! things from whoever generates signals: the bar history for a symbol and the
//! candidate signals for a strategy. The `SignalSource` trait is that seam.

use async_trait::async_trait;
use thiserror::Error;

use super::{Bar, LookbackPeriod, Timeframe};
use crate::strategy::{Signal, SignalRecord};

// ============================================================================
// Source Error
// ============================================================================

/// Errors raised by a signal source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No data for the requested symbol/timeframe/strategy
    #[error("Data not found: {0}")]
    NotFound(String),

    /// Data exists but could not be decoded
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source is unavailable
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Check if the error means the data simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ============================================================================
// Signal Source Trait
// ============================================================================

/// Provider of bar history and candidate signals.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Source name, used in logs
    fn name(&self) -> &'static str;

    /// Fetch bars for a symbol, ascending by timestamp.
    ///
    /// # Arguments
    /// * `symbol` - Instrument symbol (e.g., "EURUSD")
    /// * `lookback` - How much history to return, counted back from the latest bar
    /// * `interval` - Bar interval
    async fn get_historical_bars(
        &self,
        symbol: &str,
        lookback: LookbackPeriod,
        interval: Timeframe,
    ) -> Result<Vec<Bar>, SourceError>;

    /// Fetch the candidate signals a strategy produced for a symbol.
    ///
    /// Order is whatever the strategy emitted; it is not guaranteed to be
    /// sorted by timestamp.
    async fn generate_signals(
        &self,
        symbol: &str,
        strategy: &str,
    ) -> Result<Vec<Signal>, SourceError>;

    /// Like [`generate_signals`](Self::generate_signals), but keeps records
    /// that failed to decode in their original position.
    ///
    /// Sources whose signals are always well-formed can rely on the default.
    async fn signal_records(
        &self,
        symbol: &str,
        strategy: &str,
    ) -> Result<Vec<SignalRecord>, SourceError> {
        let signals = self.generate_signals(symbol, strategy).await?;
        Ok(signals.into_iter().map(SignalRecord::from).collect())
    }
}

/// Drop bars older than the lookback window.
pub(crate) fn apply_lookback(mut bars: Vec<Bar>, lookback: LookbackPeriod) -> Vec<Bar> {
    let cutoff = bars
        .iter()
        .map(|b| b.timestamp)
        .max()
        .and_then(|latest| lookback.cutoff(latest));

    if let Some(cutoff) = cutoff {
        bars.retain(|b| b.timestamp >= cutoff);
    }
    bars
}
