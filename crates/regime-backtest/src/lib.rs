//! regime-backtest
//!
//! The event loop: feeds bars to a registered strategy one timestamp at a
//! time, executes its signals against the portfolio ledger, and snapshots
//! state before marking each bar's close to market. Single-threaded,
//! synchronous, deterministic — no wall clock, no randomness.

mod engine;
mod types;

pub use engine::BacktestEngine;
pub use types::{BacktestConfig, BacktestError, BacktestReport, RegimeSnapshot};
