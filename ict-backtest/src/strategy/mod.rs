//! Trading signal types.
//!
//! Signals are produced by an external strategy agent; this module only
//! defines their shape.

mod signal;

pub use signal::{Signal, SignalDirection, SignalRecord};
