//! regime-testkit
//!
//! Synthetic bar generators used by the crate's scenario tests. Deliberately
//! small: this workspace has no live-trading orchestrator or broker surface
//! to stub out, so the testkit's only job is producing deterministic bar
//! series.

mod generators;

pub use generators::{flat_market, monotone_trend, quiet_then_shock, spike_then_crush};
