//! Configuration management for the ICT backtest service.
//!
//! The service reads a single configuration file at `~/.ict-backtest/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ICT_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ICT_BACKTEST_HOST` → backtest.host
//! - `ICT_BACKTEST_PORT` → backtest.port
//! - `ICT_BACKTEST_DATA_DIR` → backtest.data_dir
//! - `ICT_LOG_LEVEL` → observability.log_level
//! - `ICT_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".ict-backtest"),
        |dirs| dirs.home_dir().join(".ict-backtest"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the backtest service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Backtest service configuration
    #[serde(default)]
    pub backtest: BacktestServiceConfig,
}

impl Config {
    /// Load configuration from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            tracing::info!("Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ICT_BACKTEST_HOST") {
            self.backtest.host = host;
        }
        if let Some(port) = lookup("ICT_BACKTEST_PORT") {
            match port.parse() {
                Ok(p) => self.backtest.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid ICT_BACKTEST_PORT"),
            }
        }
        if let Some(dir) = lookup("ICT_BACKTEST_DATA_DIR") {
            self.backtest.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("ICT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("ICT_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Socket address string the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.backtest.host, self.backtest.port)
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Backtest Service Configuration
// ============================================================================

/// Backtest service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestServiceConfig {
    /// HTTP host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `bars/` and `signals/` JSON files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Bar interval used when a request omits one
    #[serde(default = "default_timeframe")]
    pub default_timeframe: String,

    /// Risk per trade (percentage of current capital) when a request omits one
    #[serde(default = "default_risk_percent")]
    pub default_risk_percent: f64,

    /// Starting capital when a request omits one
    #[serde(default = "default_initial_capital")]
    pub default_initial_capital: f64,

    /// How much history to request from the signal source (e.g. "2y", "6mo")
    #[serde(default = "default_lookback_period")]
    pub lookback_period: String,

    /// Start of the backtest window when a request omits one (YYYY-MM-DD)
    #[serde(default = "default_start_date")]
    pub start_date: String,

    /// End of the backtest window when a request omits one (YYYY-MM-DD)
    #[serde(default = "default_end_date")]
    pub end_date: String,

    /// Allow a signal to open while an earlier trade is still running
    #[serde(default = "default_true")]
    pub allow_overlapping_trades: bool,

    /// Wall-clock limit for a single run, in seconds
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
}

impl Default for BacktestServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            default_timeframe: default_timeframe(),
            default_risk_percent: default_risk_percent(),
            default_initial_capital: default_initial_capital(),
            lookback_period: default_lookback_period(),
            start_date: default_start_date(),
            end_date: default_end_date(),
            allow_overlapping_trades: true,
            run_timeout_secs: default_run_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}
fn default_host() -> String {
    "127.0.0.1".into()
}
const fn default_port() -> u16 {
    8000
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_timeframe() -> String {
    "1h".into()
}
const fn default_risk_percent() -> f64 {
    1.0
}
const fn default_initial_capital() -> f64 {
    10_000.0
}
fn default_lookback_period() -> String {
    "2y".into()
}
fn default_start_date() -> String {
    "2020-01-01".into()
}
fn default_end_date() -> String {
    "2024-01-01".into()
}
const fn default_true() -> bool {
    true
}
const fn default_run_timeout() -> u64 {
    30
}

// ============================================================================
// Tests
// ============================================================================
