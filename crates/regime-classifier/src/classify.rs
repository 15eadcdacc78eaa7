//! Hysteretic (trend, vol) classification.

use regime_indicators::{kalman_trend, normalize_trend, realized_volatility, rolling_zscore, round_to_precision, sma};

use crate::types::{Cell, RegimeClassifierState, RegimeConfig, TrendState, VolState};

/// Output of a single classification step.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifyOutput {
    /// `None` before warmup is complete — the strategy emits no signals.
    pub cell: Option<Cell>,
    pub trend_state: TrendState,
    pub vol_state: VolState,
    pub t_norm: f64,
    /// Consecutive bars the cell-1 exit condition has held, before the
    /// confirmation window resets it or confirms the exit. `0` whenever
    /// confirmation is disabled or the previous cell wasn't cell 1.
    pub cell1_exit_counter: u32,
}

/// Classify the bar ending at `closes.last()` given the full close history so
/// far, the previous persisted state, and the parameter bundle.
///
/// `closes` must include the bar currently being classified as its last
/// element. Returns `cell: None` if there isn't enough history yet to
/// compute every required indicator (warmup not met) — this is the
/// `IndicatorWarmupNotMet` internal condition the spec says must never
/// surface to the caller as an error, only as "no cell yet".
pub fn classify(
    closes: &[f64],
    cfg: &RegimeConfig,
    prev: &RegimeClassifierState,
) -> ClassifyOutput {
    let warmup_needed = cfg.warmup_period(0);
    if closes.len() < warmup_needed {
        return ClassifyOutput {
            cell: None,
            trend_state: prev.trend_state,
            vol_state: prev.vol_state,
            t_norm: 0.0,
            cell1_exit_counter: prev.cell1_exit_counter,
        };
    }

    // --- Trend determination ---
    let sma_fast = sma(closes, cfg.sma_fast);
    let sma_slow = sma(closes, cfg.sma_slow);
    let kalman_series = kalman_trend(closes, cfg.kalman);
    let velocity = kalman_series.last().map(|k| k.velocity).unwrap_or(0.0);
    let t_norm = round_to_precision(normalize_trend(velocity, cfg.t_max), 6);

    let trend_state = match (sma_fast, sma_slow) {
        (Some(fast), Some(slow)) if fast > slow && t_norm > cfg.t_norm_bull_thresh => TrendState::BullStrong,
        (Some(fast), Some(slow)) if fast < slow && t_norm < cfg.t_norm_bear_thresh => TrendState::BearStrong,
        _ => TrendState::Sideways,
    };

    // --- Volatility determination (hysteretic) ---
    let realized_vols: Vec<f64> = realized_vol_series(closes, cfg.realized_vol_window);
    let z = if realized_vols.len() >= cfg.vol_baseline_window {
        rolling_zscore(&realized_vols, cfg.vol_baseline_window)
    } else {
        None
    };

    let mut vol_state = prev.vol_state;
    if let Some(z) = z {
        let z = round_to_precision(z, 6);
        vol_state = match prev.vol_state {
            VolState::Low if z > cfg.upper_thresh_z => VolState::High,
            VolState::High if z < cfg.lower_thresh_z => VolState::Low,
            other => other,
        };
    }

    // --- Vol-crush override ---
    let mut trend_state = trend_state;
    if realized_vols.len() > cfg.vol_crush_lookback {
        let sigma_t = *realized_vols.last().unwrap();
        let sigma_lag = realized_vols[realized_vols.len() - 1 - cfg.vol_crush_lookback];
        if sigma_lag.abs() > f64::EPSILON {
            let delta_vol = round_to_precision((sigma_t - sigma_lag) / sigma_lag, 6);
            if delta_vol < cfg.vol_crush_threshold {
                vol_state = VolState::Low;
                if trend_state == TrendState::BearStrong {
                    trend_state = TrendState::Sideways;
                }
            }
        }
    }

    // --- Cell 1 exit confirmation ---
    let candidate_cell = Cell::from_states(trend_state, vol_state);

    let (cell, raw_counter) = if cfg.cell1_exit_confirmation_enabled && prev.current_cell == Some(Cell::Cell1) {
        let raw_counter = if t_norm < cfg.t_norm_bull_thresh { prev.cell1_exit_counter + 1 } else { 0 };
        if raw_counter >= cfg.cell1_exit_confirmation_days {
            (candidate_cell, raw_counter)
        } else {
            (Cell::Cell1, raw_counter)
        }
    } else {
        (candidate_cell, 0)
    };

    ClassifyOutput {
        cell: Some(cell),
        trend_state,
        vol_state,
        t_norm,
        cell1_exit_counter: raw_counter,
    }
}

/// Classify and fold the result into an updated persisted state.
pub fn classify_and_update(
    closes: &[f64],
    cfg: &RegimeConfig,
    prev: &RegimeClassifierState,
) -> (ClassifyOutput, RegimeClassifierState) {
    let out = classify(closes, cfg, prev);

    let new_state = RegimeClassifierState {
        trend_state: out.trend_state,
        vol_state: out.vol_state,
        current_cell: out.cell,
        vol_crush_cooldown: prev.vol_crush_cooldown,
        cell1_exit_counter: if out.cell == Some(Cell::Cell1) { out.cell1_exit_counter } else { 0 },
    };

    (out, new_state)
}

fn realized_vol_series(closes: &[f64], lookback: usize) -> Vec<f64> {
    if closes.len() < lookback + 1 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(closes.len() - lookback);
    for end in (lookback + 1)..=closes.len() {
        if let Some(v) = realized_volatility(&closes[..end], lookback) {
            out.push(v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cfg() -> RegimeConfig {
        RegimeConfig {
            sma_fast: 10,
            sma_slow: 30,
            t_norm_bull_thresh: 0.05,
            t_norm_bear_thresh: -0.05,
            t_max: 1.0,
            realized_vol_window: 10,
            vol_baseline_window: 20,
            upper_thresh_z: 1.5,
            lower_thresh_z: -0.5,
            vol_crush_threshold: -0.15,
            vol_crush_lookback: 5,
            cell1_exit_confirmation_enabled: false,
            cell1_exit_confirmation_days: 2,
            kalman: regime_indicators::KalmanConfig::default(),
        }
    }

    #[test]
    fn flat_market_classifies_cell3() {
        let cfg = base_cfg();
        let closes = vec![100.0; 100];
        let state = RegimeClassifierState::default();
        let out = classify(&closes, &cfg, &state);
        assert_eq!(out.cell, Some(Cell::Cell3));
    }

    #[test]
    fn insufficient_history_is_none() {
        let cfg = base_cfg();
        let closes = vec![100.0; 5];
        let state = RegimeClassifierState::default();
        let out = classify(&closes, &cfg, &state);
        assert_eq!(out.cell, None);
    }

    #[test]
    fn monotone_uptrend_classifies_cell1() {
        let cfg = base_cfg();
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + i as f64 * 0.5).collect();
        let state = RegimeClassifierState::default();
        let out = classify(&closes, &cfg, &state);
        assert_eq!(out.cell, Some(Cell::Cell1));
    }

    #[test]
    fn cell1_exit_confirmation_holds_for_n_bars() {
        let mut cfg = base_cfg();
        cfg.cell1_exit_confirmation_enabled = true;
        cfg.cell1_exit_confirmation_days = 2;

        let mut state = RegimeClassifierState {
            current_cell: Some(Cell::Cell1),
            trend_state: TrendState::BullStrong,
            vol_state: VolState::Low,
            vol_crush_cooldown: 0,
            cell1_exit_counter: 0,
        };
        // Flat closes => t_norm near 0, below bull threshold => should count
        // toward exit but stay in cell 1 until the counter reaches N.
        let closes = vec![100.0; 100];

        let (out1, state1) = classify_and_update(&closes, &cfg, &state);
        assert_eq!(out1.cell, Some(Cell::Cell1));
        assert_eq!(state1.cell1_exit_counter, 1);

        state = state1;
        let (out2, _state2) = classify_and_update(&closes, &cfg, &state);
        assert_eq!(out2.cell, Some(Cell::Cell3));
    }
}
