//! Market data types and signal sources.
//!
//! Bars arrive from a [`SignalSource`], which also hands out the candidate
//! signals for a strategy. Two sources ship with the service:
//! - **InMemorySource**: fixtures held in memory (tests, demo data)
//! - **JsonFileSource**: `bars/` and `signals/` JSON files under a data directory

mod file_source;
mod memory;
mod provider;
pub mod timestamp;

pub use file_source::JsonFileSource;
pub use memory::InMemorySource;
pub use provider::{SignalSource, SourceError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Timeframe
// ============================================================================

/// Bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    /// 1-minute bars
    M1,
    /// 5-minute bars
    M5,
    /// 15-minute bars
    M15,
    /// 30-minute bars
    M30,
    /// 1-hour bars
    H1,
    /// 4-hour bars
    H4,
    /// Daily bars
    Daily,
    /// Weekly bars
    Weekly,
}

impl Timeframe {
    /// Interval string used in requests and data file names (e.g. "1h").
    pub fn as_interval(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::Daily => "1d",
            Self::Weekly => "1wk",
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    /// Lenient parse: "1h", "H1", "60m", "1d", "D", "1wk", ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1M" | "M1" | "1MIN" => Ok(Self::M1),
            "5M" | "M5" | "5MIN" => Ok(Self::M5),
            "15M" | "M15" | "15MIN" => Ok(Self::M15),
            "30M" | "M30" | "30MIN" => Ok(Self::M30),
            "1H" | "H1" | "60M" => Ok(Self::H1),
            "4H" | "H4" | "240M" => Ok(Self::H4),
            "D" | "1D" | "DAILY" => Ok(Self::Daily),
            "W" | "1W" | "1WK" | "WEEKLY" => Ok(Self::Weekly),
            _ => Err(format!("unsupported timeframe '{}'", s)),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_interval())
    }
}

// ============================================================================
// Lookback Period
// ============================================================================

/// How far back a source should reach, e.g. "2y", "6mo", "5d", "max".
///
/// Months count as 30 days and years as 365 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookbackPeriod {
    /// Everything the source has
    Max,
    /// A fixed span ending at the most recent bar
    Span(Duration),
}

impl LookbackPeriod {
    /// Earliest timestamp to keep, given the latest bar time.
    pub fn cutoff(&self, latest: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Max => None,
            Self::Span(span) => latest.checked_sub_signed(*span),
        }
    }
}

impl FromStr for LookbackPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "max" {
            return Ok(Self::Max);
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("lookback period '{}' has no unit", s))?;
        let (count, unit) = s.split_at(split);
        let count: i64 = count
            .parse()
            .map_err(|_| format!("lookback period '{}' has no count", s))?;
        if count <= 0 {
            return Err(format!("lookback period '{}' must be positive", s));
        }

        let days_per_unit = match unit {
            "d" => 1,
            "wk" | "w" => 7,
            "mo" => 30,
            "y" => 365,
            _ => return Err(format!("lookback period '{}' has unknown unit '{}'", s, unit)),
        };

        count
            .checked_mul(days_per_unit)
            .and_then(Duration::try_days)
            .map(Self::Span)
            .ok_or_else(|| format!("lookback period '{}' is too long", s))
    }
}

// ============================================================================
// Bar
// ============================================================================

/// One OHLC price sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    /// Create a bar without volume
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: 0.0,
        }
    }
}

/// Index of the first pair of bars that is not strictly ascending, if any.
pub fn first_unordered(bars: &[Bar]) -> Option<usize> {
    bars.windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        .map(|i| i + 1)
}

// ============================================================================
// Tests
// ============================================================================
