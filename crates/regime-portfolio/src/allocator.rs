//! Regime-driven allocation: maps a classified cell to target weights over
//! the fixed five-slot instrument universe, with dynamic safe-haven
//! selection, leverage scaling, and rebalance gating.

use std::fmt;

use regime_classifier::Cell;

/// The five allocation slots every allocation targets. `Cash` always
/// absorbs whatever isn't assigned to an instrument.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    PrimaryEquity,
    LeveragedEquity,
    LongDurationDefensive,
    InverseDurationDefensive,
    Cash,
}

pub const ALL_SLOTS: [Slot; 5] = [
    Slot::PrimaryEquity,
    Slot::LeveragedEquity,
    Slot::LongDurationDefensive,
    Slot::InverseDurationDefensive,
    Slot::Cash,
];

/// Target weights for each slot, always summing to 1.0 (within float
/// tolerance) after leverage renormalization.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Weights {
    pub primary_equity: f64,
    pub leveraged_equity: f64,
    pub long_duration_defensive: f64,
    pub inverse_duration_defensive: f64,
    pub cash: f64,
}

impl Weights {
    pub fn zero() -> Self {
        Weights {
            primary_equity: 0.0,
            leveraged_equity: 0.0,
            long_duration_defensive: 0.0,
            inverse_duration_defensive: 0.0,
            cash: 0.0,
        }
    }

    pub fn get(&self, slot: Slot) -> f64 {
        match slot {
            Slot::PrimaryEquity => self.primary_equity,
            Slot::LeveragedEquity => self.leveraged_equity,
            Slot::LongDurationDefensive => self.long_duration_defensive,
            Slot::InverseDurationDefensive => self.inverse_duration_defensive,
            Slot::Cash => self.cash,
        }
    }

    /// L1 distance between two weight vectors, used for rebalance gating.
    pub fn l1_distance(&self, other: &Weights) -> f64 {
        ALL_SLOTS.iter().map(|&s| (self.get(s) - other.get(s)).abs()).sum()
    }

    fn sum(&self) -> f64 {
        self.primary_equity
            + self.leveraged_equity
            + self.long_duration_defensive
            + self.inverse_duration_defensive
            + self.cash
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocationError {
    NegativeLeverageScalar,
    RebalanceThresholdOutOfRange,
    /// Equity marked to market was zero or negative; no weight vector can be
    /// sized against it.
    NonPositiveEquity,
    /// A weight was supplied for a symbol outside the declared universe.
    UnknownSymbol,
    /// Internal consistency check on the base weight table: a row didn't
    /// sum to 1.0 before leverage scaling.
    WeightsDoNotSumToOne,
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationError::NegativeLeverageScalar => write!(f, "leverage_scalar must be >= 0"),
            AllocationError::RebalanceThresholdOutOfRange => {
                write!(f, "rebalance_threshold must be in [0, 1]")
            }
            AllocationError::NonPositiveEquity => write!(f, "equity must be > 0 to size a target allocation"),
            AllocationError::UnknownSymbol => write!(f, "weight given for a symbol outside the declared universe"),
            AllocationError::WeightsDoNotSumToOne => write!(f, "base weight table row does not sum to 1.0"),
        }
    }
}

impl std::error::Error for AllocationError {}

#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AllocationConfig {
    pub leverage_scalar: f64,
    pub rebalance_threshold: f64,
    pub max_bond_weight: f64,
}

impl AllocationConfig {
    pub fn validate(&self) -> Result<(), AllocationError> {
        if self.leverage_scalar < 0.0 {
            return Err(AllocationError::NegativeLeverageScalar);
        }
        if !(0.0..=1.0).contains(&self.rebalance_threshold) {
            return Err(AllocationError::RebalanceThresholdOutOfRange);
        }
        Ok(())
    }
}

/// The base six-row table, before leverage scaling or safe-haven selection.
fn base_weights(cell: Cell) -> Weights {
    match cell {
        Cell::Cell1 => Weights {
            leveraged_equity: 0.60,
            primary_equity: 0.40,
            ..Weights::zero()
        },
        Cell::Cell2 => Weights {
            primary_equity: 1.00,
            ..Weights::zero()
        },
        Cell::Cell3 => Weights {
            leveraged_equity: 0.20,
            primary_equity: 0.80,
            ..Weights::zero()
        },
        Cell::Cell4 => Weights {
            cash: 1.00,
            ..Weights::zero()
        },
        Cell::Cell5 => Weights {
            primary_equity: 0.50,
            // Defensive half is resolved dynamically by `apply_safe_haven`.
            long_duration_defensive: 0.50,
            ..Weights::zero()
        },
        Cell::Cell6 => Weights {
            long_duration_defensive: 1.00,
            ..Weights::zero()
        },
    }
}

/// For cells 5 and 6, pick long-duration-leveraged vs. inverse-duration
/// defensive based on the bond trend proxy, and cap the defensive sleeve at
/// `max_bond_weight` with the remainder parked in cash. Cell 4 is always
/// forced to 100% cash and never reaches this function with a nonzero
/// defensive weight.
pub fn apply_safe_haven(mut weights: Weights, cell: Cell, bond_sma_fast: f64, bond_sma_slow: f64, cfg: &AllocationConfig) -> Weights {
    if !matches!(cell, Cell::Cell5 | Cell::Cell6) {
        return weights;
    }
    let defensive_total = weights.long_duration_defensive + weights.inverse_duration_defensive;
    if defensive_total <= 0.0 {
        return weights;
    }
    let capped = defensive_total.min(cfg.max_bond_weight);
    let leftover_to_cash = defensive_total - capped;

    if bond_sma_fast > bond_sma_slow {
        weights.long_duration_defensive = capped;
        weights.inverse_duration_defensive = 0.0;
    } else {
        weights.long_duration_defensive = 0.0;
        weights.inverse_duration_defensive = capped;
    }
    weights.cash += leftover_to_cash;
    weights
}

/// Multiply leveraged-instrument weights by `leverage_scalar`, then
/// renormalize the whole vector to sum to 1.
pub fn apply_leverage_and_renormalize(mut weights: Weights, leverage_scalar: f64) -> Weights {
    weights.leveraged_equity *= leverage_scalar;
    let total = weights.sum();
    if total <= 0.0 {
        return Weights {
            cash: 1.0,
            ..Weights::zero()
        };
    }
    weights.primary_equity /= total;
    weights.leveraged_equity /= total;
    weights.long_duration_defensive /= total;
    weights.inverse_duration_defensive /= total;
    weights.cash /= total;
    weights
}

/// Full target-weight computation for a classified cell.
pub fn target_weights(cell: Cell, bond_sma_fast: f64, bond_sma_slow: f64, cfg: &AllocationConfig) -> Weights {
    let base = base_weights(cell);
    let with_haven = apply_safe_haven(base, cell, bond_sma_fast, bond_sma_slow, cfg);
    apply_leverage_and_renormalize(with_haven, cfg.leverage_scalar)
}

/// Whether a rebalance should fire: either the L1 distance between current
/// and target weights exceeds the threshold, or the cell changed since the
/// previous bar.
pub fn should_rebalance(current: &Weights, target: &Weights, prev_cell: Option<Cell>, cell: Cell, cfg: &AllocationConfig) -> bool {
    let cell_changed = prev_cell != Some(cell);
    cell_changed || current.l1_distance(target) > cfg.rebalance_threshold
}

/// Guard run before a target-weight vector is sized against equity: an
/// engine must never attempt to derive dollar targets from zero or negative
/// equity.
pub fn check_positive_equity(equity_micros: i64) -> Result<(), AllocationError> {
    if equity_micros <= 0 {
        Err(AllocationError::NonPositiveEquity)
    } else {
        Ok(())
    }
}

/// Guard run before resolving a symbol's weight: the symbol must be one of
/// the engine's declared tradable universe.
pub fn check_known_symbol(symbol: &str, known_symbols: &[&str]) -> Result<(), AllocationError> {
    if known_symbols.contains(&symbol) {
        Ok(())
    } else {
        Err(AllocationError::UnknownSymbol)
    }
}

/// Internal consistency check: every row of the base six-cell weight table
/// must sum to 1.0 before leverage scaling and safe-haven selection are
/// applied. Never trust the table blindly; verify it once here.
pub fn validate_base_weight_table() -> Result<(), AllocationError> {
    const ALL_CELLS: [Cell; 6] = [Cell::Cell1, Cell::Cell2, Cell::Cell3, Cell::Cell4, Cell::Cell5, Cell::Cell6];
    for &cell in &ALL_CELLS {
        let sum = base_weights(cell).sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(AllocationError::WeightsDoNotSumToOne);
        }
    }
    Ok(())
}
