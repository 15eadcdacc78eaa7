//! regime-classifier
//!
//! Turns a bar (by way of its close-price history) into a discrete
//! `(TrendState, VolState)` cell, applying hysteresis on the volatility
//! z-score, a vol-crush override, and an optional cell-1-exit confirmation
//! delay. Pure given `(closes, config, prior state)` — no IO, no time, no
//! randomness.

mod classify;
mod types;

pub use classify::{classify, classify_and_update, ClassifyOutput};
pub use types::{Cell, RegimeClassifierState, RegimeConfig, TrendState, VolState};
