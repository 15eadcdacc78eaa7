//! regime-portfolio
//!
//! Portfolio accounting and regime-driven allocation:
//!
//! - `fixedpoint` — the `Micros` fixed-point money type all other modules
//!   build on.
//! - `types` — `Position` (average-cost accounted), `Fill`, `PortfolioState`.
//! - `accounting` — order execution: BUY/SELL fills against a portfolio.
//! - `signals` — reduces BUY_PERCENT/SELL_PERCENT/REBALANCE_TO_WEIGHT
//!   signals to concrete share-quantity order intents.
//! - `allocator` — maps a classified cell to target instrument weights.
//! - `metrics` — exposure and equity, always recomputed from first
//!   principles.
//! - `ordering` — canonical fill ordering for deterministic replay.
//! - `ledger` — the append-only fill/rejection record plus snapshotting.

pub mod accounting;
pub mod allocator;
pub mod fixedpoint;
pub mod ledger;
pub mod metrics;
pub mod ordering;
pub mod signals;
pub mod types;

pub use accounting::{apply_buy, apply_sell, CommissionModel};
pub use allocator::{
    apply_leverage_and_renormalize, apply_safe_haven, check_known_symbol, check_positive_equity,
    should_rebalance, target_weights, validate_base_weight_table, AllocationConfig, AllocationError,
    Slot, Weights,
};
pub use fixedpoint::{i128_to_i64_clamp, Micros};
pub use ledger::{Ledger, LedgerError, Snapshot};
pub use metrics::{compute_equity_micros, compute_exposure_micros, compute_unrealized_pnl_micros, enforce_max_gross_exposure, ExposureBreach, ExposureMetrics};
pub use ordering::{apply_fills_canonical, sort_fills_canonical, TaggedFill};
pub use signals::{rebalance_order_intents, resolve_signal, OrderIntent, Signal, SignalKind};
pub use types::{CashEntry, Fill, LedgerEntry, PortfolioState, Position, RejectionReason, Side};

/// Scale factor for the `Micros` fixed-point type: 1 unit = 1_000_000 Micros.
pub const MICROS_SCALE: i64 = 1_000_000;

/// Map of symbol to its current close price, as fed to `mark_to_market`.
pub type MarkMap = std::collections::BTreeMap<String, Micros>;

/// Build a `MarkMap` from an iterator of `(symbol, close)` pairs.
pub fn marks<I, S>(pairs: I) -> MarkMap
where
    I: IntoIterator<Item = (S, Micros)>,
    S: Into<String>,
{
    pairs.into_iter().map(|(s, p)| (s.into(), p)).collect()
}
