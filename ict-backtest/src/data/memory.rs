//! In-memory signal source.

use async_trait::async_trait;
use std::collections::HashMap;

use super::provider::{apply_lookback, SignalSource, SourceError};
use super::{Bar, LookbackPeriod, Timeframe};
use crate::strategy::Signal;

/// Signal source backed by fixtures held in memory.
///
/// Symbols are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    bars: HashMap<(String, Timeframe), Vec<Bar>>,
    signals: HashMap<(String, String), Vec<Signal>>,
}

impl InMemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bars for a symbol/timeframe
    pub fn with_bars(mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) -> Self {
        self.bars.insert((symbol.to_uppercase(), timeframe), bars);
        self
    }

    /// Register signals for a symbol/strategy
    pub fn with_signals(mut self, symbol: &str, strategy: &str, signals: Vec<Signal>) -> Self {
        self.signals
            .insert((symbol.to_uppercase(), strategy.to_string()), signals);
        self
    }
}

#[async_trait]
impl SignalSource for InMemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_historical_bars(
        &self,
        symbol: &str,
        lookback: LookbackPeriod,
        interval: Timeframe,
    ) -> Result<Vec<Bar>, SourceError> {
        let bars = self
            .bars
            .get(&(symbol.to_uppercase(), interval))
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("{} {} bars", symbol, interval)))?;

        Ok(apply_lookback(bars, lookback))
    }

    async fn generate_signals(
        &self,
        symbol: &str,
        strategy: &str,
    ) -> Result<Vec<Signal>, SourceError> {
        // An unknown strategy simply produced nothing
        Ok(self
            .signals
            .get(&(symbol.to_uppercase(), strategy.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
