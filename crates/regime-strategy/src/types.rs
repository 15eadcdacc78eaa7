//! Strategy trait and host-enforced contract: exactly one strategy per
//! run, a single declared timeframe, and shadow-mode gating that lets a
//! strategy run for observation without its signals reaching the
//! portfolio simulator.

use std::collections::BTreeMap;

use regime_classifier::{Cell, RegimeClassifierState, TrendState, VolState};
use regime_portfolio::Signal;

/// Strategy identity plus its one declared timeframe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategySpec {
    pub id: String,
    pub timeframe_secs: i64,
}

impl StrategySpec {
    pub fn new(id: impl Into<String>, timeframe_secs: i64) -> Self {
        debug_assert!(timeframe_secs > 0);
        Self {
            id: id.into(),
            timeframe_secs,
        }
    }
}

/// A minimal bar view handed to strategies: no broker/DB access, only what
/// `on_bar` needs to update its own accumulated history.
#[derive(Clone, Debug, PartialEq)]
pub struct BarView {
    pub symbol: String,
    pub end_ts: i64,
    pub close: f64,
}

/// Context passed to a strategy for a single timestamp. Carries every
/// universe symbol's bar at this timestamp (a regime strategy needs the
/// primary equity, leveraged equity, defensive instruments, and the bond
/// trend proxy all at once to compute a rebalance). `bars_processed` lets
/// the event loop and the strategy agree on whether warmup is complete
/// without either side guessing at the other's internal counters.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyContext {
    pub timeframe_secs: i64,
    pub end_ts: i64,
    pub bars: BTreeMap<String, BarView>,
    pub bars_processed: usize,
}

impl StrategyContext {
    pub fn close_of(&self, symbol: &str) -> Option<f64> {
        self.bars.get(symbol).map(|b| b.close)
    }
}

/// Queryable strategy state, exposed for persistence and for the
/// snapshot/reporting layer.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyState {
    pub cell: Option<Cell>,
    pub trend_state: TrendState,
    pub vol_state: VolState,
    pub classifier_state: RegimeClassifierState,
    pub target_weights: regime_portfolio::Weights,
}

/// What a strategy produces for a bar: zero or more signals, in the order
/// they should be executed.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyOutput {
    pub signals: Vec<Signal>,
}

impl StrategyOutput {
    pub fn empty() -> Self {
        Self { signals: Vec::new() }
    }

    pub fn new(signals: Vec<Signal>) -> Self {
        Self { signals }
    }
}

/// Capability-set a strategy must implement: declare its warmup
/// requirement, react to a bar, and expose its current state for
/// persistence/reporting. No dynamic reflection, no global lookup.
pub trait Strategy: Send + Sync {
    fn spec(&self) -> StrategySpec;

    /// Number of bars of history this strategy needs before it will
    /// produce signals. The event loop enforces this; `on_bar` is never
    /// called before it's satisfied.
    fn warmup_requirement(&self) -> usize;

    fn on_bar(&mut self, ctx: &StrategyContext) -> StrategyOutput;

    fn current_state(&self) -> StrategyState;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrategyHostError {
    MultiStrategyNotAllowed,
    TimeframeMismatch { expected_secs: i64, got_secs: i64 },
    NoStrategyRegistered,
}

impl std::fmt::Display for StrategyHostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyHostError::MultiStrategyNotAllowed => write!(f, "a strategy is already registered"),
            StrategyHostError::TimeframeMismatch { expected_secs, got_secs } => {
                write!(f, "timeframe mismatch: expected {expected_secs}s, got {got_secs}s")
            }
            StrategyHostError::NoStrategyRegistered => write!(f, "no strategy registered"),
        }
    }
}

impl std::error::Error for StrategyHostError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShadowMode {
    Off,
    On,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IntentMode {
    Live,
    Shadow,
}

/// Output of running a strategy under the host for one bar.
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyIntents {
    pub mode: IntentMode,
    pub output: StrategyOutput,
}

impl StrategyIntents {
    pub fn should_execute(&self) -> bool {
        self.mode == IntentMode::Live
    }
}
