//! JSON file signal source.
//!
//! Layout under the data directory:
//!
//! ```text
//! <data_dir>/
//!   bars/<SYMBOL>_<interval>.json      array of bars
//!   signals/<SYMBOL>_<strategy>.json   array of signals
//! ```
//!
//! A missing signal file means the strategy produced nothing. Signal records
//! are decoded one by one so a bad record only affects itself.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use super::provider::{apply_lookback, SignalSource, SourceError};
use super::{Bar, LookbackPeriod, Timeframe};
use crate::strategy::{Signal, SignalRecord};

/// Signal source reading exported bars and signals from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    data_dir: PathBuf,
}

impl JsonFileSource {
    /// Create a source rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the bar file for a symbol/interval
    pub fn bars_path(&self, symbol: &str, interval: Timeframe) -> PathBuf {
        self.data_dir
            .join("bars")
            .join(format!("{}_{}.json", symbol.to_uppercase(), interval.as_interval()))
    }

    /// Path of the signal file for a symbol/strategy
    pub fn signals_path(&self, symbol: &str, strategy: &str) -> PathBuf {
        self.data_dir
            .join("signals")
            .join(format!("{}_{}.json", symbol.to_uppercase(), strategy))
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SourceError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content).map_err(|e| SourceError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Strategy names end up in file names; keep them to a safe alphabet.
fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '='))
        && !value.contains("..")
}

#[async_trait]
impl SignalSource for JsonFileSource {
    fn name(&self) -> &'static str {
        "json_file"
    }

    async fn get_historical_bars(
        &self,
        symbol: &str,
        lookback: LookbackPeriod,
        interval: Timeframe,
    ) -> Result<Vec<Bar>, SourceError> {
        if !is_safe_component(symbol) {
            return Err(SourceError::NotFound(format!("symbol '{}'", symbol)));
        }

        let path = self.bars_path(symbol, interval);
        let bars: Vec<Bar> = read_json(&path).await?;
        tracing::debug!(path = %path.display(), count = bars.len(), "Loaded bars");

        Ok(apply_lookback(bars, lookback))
    }

    async fn generate_signals(
        &self,
        symbol: &str,
        strategy: &str,
    ) -> Result<Vec<Signal>, SourceError> {
        let records = self.signal_records(symbol, strategy).await?;
        Ok(records
            .into_iter()
            .filter_map(SignalRecord::into_signal)
            .collect())
    }

    async fn signal_records(
        &self,
        symbol: &str,
        strategy: &str,
    ) -> Result<Vec<SignalRecord>, SourceError> {
        if !is_safe_component(symbol) || !is_safe_component(strategy) {
            return Err(SourceError::NotFound(format!(
                "signals for '{}' / '{}'",
                symbol, strategy
            )));
        }

        let path = self.signals_path(symbol, strategy);
        let raw: Vec<serde_json::Value> = match read_json(&path).await {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => {
                tracing::debug!(path = %path.display(), "No signal file, strategy produced nothing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let records: Vec<SignalRecord> = raw.into_iter().map(SignalRecord::from_value).collect();
        for (index, record) in records.iter().enumerate() {
            if let SignalRecord::Malformed { reason, .. } = record {
                tracing::warn!(path = %path.display(), index, reason = %reason, "Malformed signal record");
            }
        }
        tracing::debug!(path = %path.display(), count = records.len(), "Loaded signals");

        Ok(records)
    }
}
