use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendState {
    BullStrong,
    Sideways,
    BearStrong,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolState {
    Low,
    High,
}

/// One of the six regime cells, numbered per the spec's cell table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Cell1,
    Cell2,
    Cell3,
    Cell4,
    Cell5,
    Cell6,
}

impl Cell {
    pub fn from_states(trend: TrendState, vol: VolState) -> Cell {
        match (trend, vol) {
            (TrendState::BullStrong, VolState::Low) => Cell::Cell1,
            (TrendState::BullStrong, VolState::High) => Cell::Cell2,
            (TrendState::Sideways, VolState::Low) => Cell::Cell3,
            (TrendState::Sideways, VolState::High) => Cell::Cell4,
            (TrendState::BearStrong, VolState::Low) => Cell::Cell5,
            (TrendState::BearStrong, VolState::High) => Cell::Cell6,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Cell::Cell1 => 1,
            Cell::Cell2 => 2,
            Cell::Cell3 => 3,
            Cell::Cell4 => 4,
            Cell::Cell5 => 5,
            Cell::Cell6 => 6,
        }
    }
}

/// Tunable parameters for the classifier. Field names match the
/// configuration surface documented for this component.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RegimeConfig {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub t_norm_bull_thresh: f64,
    pub t_norm_bear_thresh: f64,
    pub t_max: f64,
    pub realized_vol_window: usize,
    pub vol_baseline_window: usize,
    pub upper_thresh_z: f64,
    pub lower_thresh_z: f64,
    pub vol_crush_threshold: f64,
    pub vol_crush_lookback: usize,
    pub cell1_exit_confirmation_enabled: bool,
    pub cell1_exit_confirmation_days: u32,
    pub kalman: regime_indicators::KalmanConfig,
}

impl RegimeConfig {
    /// `max(indicator_period) + safety_margin`, the warmup the event loop
    /// must enforce before calling the strategy.
    pub fn warmup_period(&self, safety_margin: usize) -> usize {
        [
            self.sma_slow,
            self.realized_vol_window + self.vol_baseline_window,
            self.vol_crush_lookback,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + safety_margin
    }
}

/// Per-strategy persisted classifier state. Round-trips through `serde` for
/// the persisted-state record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeClassifierState {
    pub trend_state: TrendState,
    pub vol_state: VolState,
    pub current_cell: Option<Cell>,
    pub vol_crush_cooldown: u32,
    pub cell1_exit_counter: u32,
}

impl Default for RegimeClassifierState {
    fn default() -> Self {
        Self {
            trend_state: TrendState::Sideways,
            vol_state: VolState::Low,
            current_cell: None,
            vol_crush_cooldown: 0,
            cell1_exit_counter: 0,
        }
    }
}
