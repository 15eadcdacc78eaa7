//! The concrete regime-driven strategy: classifies the market into a cell
//! each bar, derives target weights, and emits `REBALANCE_TO_WEIGHT`
//! signals only when the rebalance gate fires.

use regime_classifier::{classify_and_update, Cell, RegimeClassifierState, RegimeConfig};
use regime_indicators::sma;
use regime_portfolio::{
    allocator::{target_weights, AllocationConfig},
    Signal, SignalKind, Weights,
};

use crate::types::{Strategy, StrategyContext, StrategyOutput, StrategySpec, StrategyState};
use crate::universe::Universe;

/// A regime strategy accumulates the *full* close history for its primary
/// equity symbol and its bond trend proxy, rather than the bounded
/// recent-bars window other strategies in this codebase use — the
/// classifier's z-score/Kalman inputs are defined over arbitrary-length
/// history, not a fixed lookback, so truncating would silently change
/// classification results partway through a run.
pub struct RegimeStrategy {
    spec: StrategySpec,
    universe: Universe,
    regime_cfg: RegimeConfig,
    alloc_cfg: AllocationConfig,
    bond_sma_fast_n: usize,
    bond_sma_slow_n: usize,
    safety_margin: usize,

    equity_closes: Vec<f64>,
    bond_closes: Vec<f64>,
    classifier_state: RegimeClassifierState,
    current_cell: Option<Cell>,
    current_target_weights: Weights,
}

impl RegimeStrategy {
    pub fn new(
        id: impl Into<String>,
        timeframe_secs: i64,
        universe: Universe,
        regime_cfg: RegimeConfig,
        alloc_cfg: AllocationConfig,
        bond_sma_fast_n: usize,
        bond_sma_slow_n: usize,
        safety_margin: usize,
    ) -> Self {
        Self {
            spec: StrategySpec::new(id, timeframe_secs),
            universe,
            regime_cfg,
            alloc_cfg,
            bond_sma_fast_n,
            bond_sma_slow_n,
            safety_margin,
            equity_closes: Vec::new(),
            bond_closes: Vec::new(),
            classifier_state: RegimeClassifierState::default(),
            current_cell: None,
            current_target_weights: Weights::zero(),
        }
    }
}

impl Strategy for RegimeStrategy {
    fn spec(&self) -> StrategySpec {
        self.spec.clone()
    }

    fn warmup_requirement(&self) -> usize {
        self.regime_cfg
            .warmup_period(self.safety_margin)
            .max(self.bond_sma_slow_n)
    }

    fn on_bar(&mut self, ctx: &StrategyContext) -> StrategyOutput {
        let Some(equity_close) = ctx.close_of(&self.universe.primary_equity) else {
            return StrategyOutput::empty();
        };
        let bond_close = ctx.close_of(&self.universe.bond_trend_proxy).unwrap_or(equity_close);

        self.equity_closes.push(equity_close);
        self.bond_closes.push(bond_close);

        let (out, new_state) = classify_and_update(&self.equity_closes, &self.regime_cfg, &self.classifier_state);
        self.classifier_state = new_state;

        let Some(cell) = out.cell else {
            // Warmup not yet complete: IndicatorWarmupNotMet stays internal,
            // the strategy simply emits nothing this bar.
            return StrategyOutput::empty();
        };

        let bond_sma_fast = sma(&self.bond_closes, self.bond_sma_fast_n).unwrap_or(bond_close);
        let bond_sma_slow = sma(&self.bond_closes, self.bond_sma_slow_n).unwrap_or(bond_close);

        let target = target_weights(cell, bond_sma_fast, bond_sma_slow, &self.alloc_cfg);

        let fires = regime_portfolio::allocator::should_rebalance(
            &self.current_target_weights,
            &target,
            self.current_cell,
            cell,
            &self.alloc_cfg,
        );

        self.current_cell = Some(cell);

        if !fires {
            return StrategyOutput::empty();
        }

        self.current_target_weights = target;

        let mut signals = Vec::new();
        for &symbol in self.universe.tradable_symbols().iter() {
            let weight = match symbol {
                s if s == self.universe.primary_equity => target.primary_equity,
                s if s == self.universe.leveraged_equity => target.leveraged_equity,
                s if s == self.universe.long_duration_defensive => target.long_duration_defensive,
                s if s == self.universe.inverse_duration_defensive => target.inverse_duration_defensive,
                _ => 0.0,
            };
            signals.push(Signal {
                symbol: symbol.to_string(),
                kind: SignalKind::RebalanceToWeight,
                amount: weight,
                source_strategy: self.spec.id.clone(),
            });
        }

        StrategyOutput::new(signals)
    }

    fn current_state(&self) -> StrategyState {
        StrategyState {
            cell: self.current_cell,
            trend_state: self.classifier_state.trend_state,
            vol_state: self.classifier_state.vol_state,
            classifier_state: self.classifier_state.clone(),
            target_weights: self.current_target_weights,
        }
    }
}
