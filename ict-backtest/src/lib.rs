//! ICT Backtest Library
//!
//! Replays trading signals from an external generator over historical bars
//! and reports how they would have performed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     ict-backtest (Rust Service)                  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐    │
//! │  │ Signal Source  │──▶│ Trade Executor │──▶│    Metrics     │    │
//! │  │ (bars+signals) │   │ (capital fold) │   │   Calculator   │    │
//! │  └────────────────┘   └────────────────┘   └────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Risk-based sizing
//! Each trade risks a fixed percentage of the capital left by every earlier
//! trade. Position size is that amount divided by the entry-to-stop distance.
//!
//! ## Exit resolution
//! - Bars after the signal bar are scanned in order
//! - Stop-loss is checked before take-profit on the same bar
//! - Without a touch the position closes at the last bar's close

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod backtest;
pub mod data;
pub mod error;
pub mod routes;
pub mod strategy;

pub use backtest::{BacktestConfig, BacktestEngine, BacktestRequest, BacktestResult};
pub use data::{InMemorySource, JsonFileSource, SignalSource};
pub use error::BacktestError;
pub use routes::{build_router, AppState};
