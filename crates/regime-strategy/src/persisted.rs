//! Schema-versioned persisted strategy state, round-trippable between a
//! checkpoint after bar `t` and a resumed run at bar `t+1`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use regime_classifier::{Cell, RegimeClassifierState, TrendState, VolState};
use regime_portfolio::{Micros, Position, PortfolioState, Weights};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedPosition {
    pub quantity: i64,
    pub average_entry_price_micros: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedWeights {
    pub primary_equity: f64,
    pub leveraged_equity: f64,
    pub long_duration_defensive: f64,
    pub inverse_duration_defensive: f64,
    pub cash: f64,
}

impl From<Weights> for PersistedWeights {
    fn from(w: Weights) -> Self {
        PersistedWeights {
            primary_equity: w.primary_equity,
            leveraged_equity: w.leveraged_equity,
            long_duration_defensive: w.long_duration_defensive,
            inverse_duration_defensive: w.inverse_duration_defensive,
            cash: w.cash,
        }
    }
}

impl From<PersistedWeights> for Weights {
    fn from(w: PersistedWeights) -> Self {
        Weights {
            primary_equity: w.primary_equity,
            leveraged_equity: w.leveraged_equity,
            long_duration_defensive: w.long_duration_defensive,
            inverse_duration_defensive: w.inverse_duration_defensive,
            cash: w.cash,
        }
    }
}

/// Full persisted state for one strategy instance, schema-versioned so
/// future fields can be added with a documented default rather than
/// breaking old checkpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedStrategyState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub strategy_id: String,
    pub last_bar_ts: i64,
    pub current_cell: Option<Cell>,
    pub trend_state: TrendState,
    pub vol_state: VolState,
    #[serde(default)]
    pub vol_crush_cooldown: u32,
    #[serde(default)]
    pub cell1_exit_counter: u32,
    pub positions: BTreeMap<String, PersistedPosition>,
    pub cash_micros: i64,
    pub last_target_weights: PersistedWeights,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Build a checkpoint record from a strategy's live classifier state and
/// its portfolio's cash/positions. Pure: no IO, no clock access — the
/// caller supplies `last_bar_ts` from the bar that produced this state.
pub fn from_engine_state(
    strategy_id: impl Into<String>,
    last_bar_ts: i64,
    classifier_state: &RegimeClassifierState,
    portfolio: &PortfolioState,
    last_target_weights: Weights,
) -> PersistedStrategyState {
    let positions = portfolio
        .positions
        .iter()
        .map(|(symbol, pos)| {
            (
                symbol.clone(),
                PersistedPosition {
                    quantity: pos.quantity,
                    average_entry_price_micros: pos.average_entry_price.raw(),
                },
            )
        })
        .collect();

    PersistedStrategyState {
        schema_version: SCHEMA_VERSION,
        strategy_id: strategy_id.into(),
        last_bar_ts,
        current_cell: classifier_state.current_cell,
        trend_state: classifier_state.trend_state,
        vol_state: classifier_state.vol_state,
        vol_crush_cooldown: classifier_state.vol_crush_cooldown,
        cell1_exit_counter: classifier_state.cell1_exit_counter,
        positions,
        cash_micros: portfolio.cash.raw(),
        last_target_weights: last_target_weights.into(),
    }
}

/// Reconstruct the classifier state, portfolio, and last target weights a
/// resumed run should start from. `initial_capital` is not part of the
/// persisted shape (it is a backtest-config input, not strategy state) and
/// must be supplied by the caller, matching the original run's config.
pub fn apply_to_engine_state(persisted: &PersistedStrategyState, initial_capital: Micros) -> (RegimeClassifierState, PortfolioState, Weights) {
    let classifier_state = RegimeClassifierState {
        trend_state: persisted.trend_state,
        vol_state: persisted.vol_state,
        current_cell: persisted.current_cell,
        vol_crush_cooldown: persisted.vol_crush_cooldown,
        cell1_exit_counter: persisted.cell1_exit_counter,
    };

    let mut portfolio = PortfolioState::new(initial_capital);
    portfolio.cash = Micros::new(persisted.cash_micros);
    for (symbol, pos) in &persisted.positions {
        let entry_price = Micros::new(pos.average_entry_price_micros);
        portfolio.positions.insert(
            symbol.clone(),
            Position {
                symbol: symbol.clone(),
                quantity: pos.quantity,
                average_entry_price: entry_price,
                // Re-marked on the first bar of the resumed run; the
                // persisted record doesn't carry a live price.
                current_price: entry_price,
            },
        );
    }

    (classifier_state, portfolio, persisted.last_target_weights.clone().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_schema_version_defaults_to_current() {
        let json = r#"{
            "strategy_id": "regime-core",
            "last_bar_ts": 100,
            "current_cell": "Cell3",
            "trend_state": "Sideways",
            "vol_state": "Low",
            "positions": {},
            "cash_micros": 1000000000,
            "last_target_weights": {
                "primary_equity": 0.8,
                "leveraged_equity": 0.2,
                "long_duration_defensive": 0.0,
                "inverse_duration_defensive": 0.0,
                "cash": 0.0
            }
        }"#;
        let state: PersistedStrategyState = serde_json::from_str(json).unwrap();
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.vol_crush_cooldown, 0);
        assert_eq!(state.cell1_exit_counter, 0);
    }

    #[test]
    fn engine_state_round_trips_through_persisted_form() {
        let mut portfolio = PortfolioState::new(Micros::new(1_000_000_000));
        portfolio.cash = Micros::new(400_000_000);
        portfolio.positions.insert(
            "SPY".to_string(),
            Position {
                symbol: "SPY".to_string(),
                quantity: 10,
                average_entry_price: Micros::new(100_000_000),
                current_price: Micros::new(105_000_000),
            },
        );

        let classifier_state = RegimeClassifierState {
            trend_state: TrendState::BullStrong,
            vol_state: VolState::Low,
            current_cell: Some(Cell::Cell1),
            vol_crush_cooldown: 2,
            cell1_exit_counter: 1,
        };

        let weights = Weights {
            primary_equity: 0.4,
            leveraged_equity: 0.6,
            long_duration_defensive: 0.0,
            inverse_duration_defensive: 0.0,
            cash: 0.0,
        };

        let persisted = from_engine_state("regime-core", 12_345, &classifier_state, &portfolio, weights);
        assert_eq!(persisted.strategy_id, "regime-core");
        assert_eq!(persisted.last_bar_ts, 12_345);
        assert_eq!(persisted.cash_micros, 400_000_000);

        let (restored_classifier, restored_portfolio, restored_weights) =
            apply_to_engine_state(&persisted, Micros::new(1_000_000_000));

        assert_eq!(restored_classifier, classifier_state);
        assert_eq!(restored_portfolio.cash, portfolio.cash);
        assert_eq!(restored_portfolio.positions["SPY"].quantity, 10);
        assert_eq!(restored_portfolio.positions["SPY"].average_entry_price, Micros::new(100_000_000));
        assert_eq!(restored_weights, weights);
    }
}
