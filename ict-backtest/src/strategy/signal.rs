//! Candidate trade proposals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::timestamp;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalDirection {
    /// Long position (buy)
    #[serde(alias = "BUY", alias = "buy", alias = "long")]
    Long,
    /// Short position (sell)
    #[serde(alias = "SELL", alias = "sell", alias = "short")]
    Short,
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// A candidate trade with entry, stop, and target levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Bar time the signal fires on
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// Instrument symbol
    pub symbol: String,
    /// Long or short
    #[serde(alias = "signal_type")]
    pub direction: SignalDirection,
    /// Entry price
    pub entry_price: f64,
    /// Stop-loss price
    pub stop_loss: f64,
    /// Take-profit price
    pub take_profit: f64,
    /// Name of the strategy that produced the signal
    #[serde(alias = "strategy")]
    pub strategy_tag: String,
    /// Strategy confidence (0.0-1.0)
    #[serde(default)]
    pub confidence: f64,
    /// Planned reward-to-risk ratio
    #[serde(default)]
    pub risk_reward_ratio: f64,
    /// Concepts the strategy cited for this signal
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concepts_used: Vec<String>,
}

impl Signal {
    /// Distance between entry and stop, the per-unit risk
    pub fn risk_distance(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    /// All price levels are finite numbers
    pub fn has_finite_levels(&self) -> bool {
        self.entry_price.is_finite() && self.stop_loss.is_finite() && self.take_profit.is_finite()
    }
}

/// One entry of a signal feed.
///
/// A feed may carry records that do not decode into a [`Signal`]. They are
/// kept in place so they can be reported alongside the usable signals.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalRecord {
    Valid(Signal),
    Malformed {
        /// Timestamp, when the record had a readable one
        timestamp: Option<DateTime<Utc>>,
        /// Decode error
        reason: String,
    },
}

impl SignalRecord {
    /// Decode one raw JSON record
    pub fn from_value(value: serde_json::Value) -> Self {
        let timestamp = value
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(timestamp::parse);

        match serde_json::from_value::<Signal>(value) {
            Ok(signal) => Self::Valid(signal),
            Err(e) => Self::Malformed {
                timestamp,
                reason: e.to_string(),
            },
        }
    }

    /// The decoded signal, if any
    pub fn into_signal(self) -> Option<Signal> {
        match self {
            Self::Valid(signal) => Some(signal),
            Self::Malformed { .. } => None,
        }
    }
}

impl From<Signal> for SignalRecord {
    fn from(signal: Signal) -> Self {
        Self::Valid(signal)
    }
}
