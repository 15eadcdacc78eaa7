use regime_classifier::Cell;
use regime_portfolio::{CommissionModel, LedgerEntry, LedgerError, Micros};

/// Backtest run configuration. Strategy parameters live in
/// `regime-classifier`/`regime-portfolio`'s own config types; this covers
/// only the event loop's own knobs.
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestConfig {
    pub timeframe_secs: i64,
    pub initial_capital: Micros,
    pub costs: CommissionModel,
}

/// One bar's worth of regime/portfolio state, captured before that bar's
/// close is marked to market — the pinned snapshot-ordering resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct RegimeSnapshot {
    pub timestamp: i64,
    pub equity: Micros,
    pub cash: Micros,
    pub positions_value: Micros,
    pub cell: Option<Cell>,
    pub target_weights: regime_portfolio::Weights,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BacktestError {
    /// A bar was marked incomplete (anti-lookahead).
    IncompleteBar { symbol: String, end_ts: i64 },
    NegativeTimestamp { end_ts: i64 },
    StrategyHost(regime_strategy::StrategyHostError),
    /// The run was cancelled; the bar at which cancellation was observed is
    /// recorded so partial results can be attributed.
    Cancelled { last_processed_ts: i64 },
    /// A fill was applied out of canonical sequence order — should be
    /// unreachable, since `execute_signals` assigns `seq_no` itself.
    Ledger(LedgerError),
}

impl std::fmt::Display for BacktestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BacktestError::IncompleteBar { symbol, end_ts } => {
                write!(f, "incomplete bar: {symbol} @ ts={end_ts}")
            }
            BacktestError::NegativeTimestamp { end_ts } => write!(f, "negative timestamp: {end_ts}"),
            BacktestError::StrategyHost(e) => write!(f, "strategy host: {e}"),
            BacktestError::Cancelled { last_processed_ts } => {
                write!(f, "cancelled after ts={last_processed_ts}")
            }
            BacktestError::Ledger(e) => write!(f, "ledger: {e}"),
        }
    }
}

impl std::error::Error for BacktestError {}

/// Full output of a backtest run.
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestReport {
    pub equity_series: Vec<(i64, Micros)>,
    pub trade_ledger: Vec<LedgerEntry>,
    pub regime_series: Vec<RegimeSnapshot>,
    pub final_positions: Vec<regime_portfolio::Position>,
    pub cancelled: bool,
}
