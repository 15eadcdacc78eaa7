//! `InvalidConfig` validation — runs once at load time, never mid-run.
//! Anything that would otherwise surface as a confusing failure partway
//! through a backtest is rejected here instead.

use std::fmt;

use crate::types::RawConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ThresholdInversion { lower_thresh_z: f64, upper_thresh_z: f64 },
    NonPositiveCapital { initial_capital_micros: i64 },
    NegativeLeverageScalar { leverage_scalar: f64 },
    RebalanceThresholdOutOfRange { rebalance_threshold: f64 },
    MaxBondWeightOutOfRange { max_bond_weight: f64 },
    DuplicateUniverseSymbol { symbol: String },
    EmptyUniverseSymbol,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ThresholdInversion { lower_thresh_z, upper_thresh_z } => {
                write!(f, "lower_thresh_z ({lower_thresh_z}) must be <= upper_thresh_z ({upper_thresh_z})")
            }
            ConfigError::NonPositiveCapital { initial_capital_micros } => {
                write!(f, "initial_capital_micros must be > 0, got {initial_capital_micros}")
            }
            ConfigError::NegativeLeverageScalar { leverage_scalar } => {
                write!(f, "leverage_scalar must be >= 0, got {leverage_scalar}")
            }
            ConfigError::RebalanceThresholdOutOfRange { rebalance_threshold } => {
                write!(f, "rebalance_threshold must be in [0, 1], got {rebalance_threshold}")
            }
            ConfigError::MaxBondWeightOutOfRange { max_bond_weight } => {
                write!(f, "max_bond_weight must be in [0, 1], got {max_bond_weight}")
            }
            ConfigError::DuplicateUniverseSymbol { symbol } => {
                write!(f, "universe symbol '{symbol}' used more than once")
            }
            ConfigError::EmptyUniverseSymbol => write!(f, "universe symbol must be non-empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

pub fn validate(raw: &RawConfig) -> Result<(), ConfigError> {
    if raw.lower_thresh_z > raw.upper_thresh_z {
        return Err(ConfigError::ThresholdInversion {
            lower_thresh_z: raw.lower_thresh_z,
            upper_thresh_z: raw.upper_thresh_z,
        });
    }
    if raw.initial_capital_micros <= 0 {
        return Err(ConfigError::NonPositiveCapital {
            initial_capital_micros: raw.initial_capital_micros,
        });
    }
    if raw.leverage_scalar < 0.0 {
        return Err(ConfigError::NegativeLeverageScalar { leverage_scalar: raw.leverage_scalar });
    }
    if !(0.0..=1.0).contains(&raw.rebalance_threshold) {
        return Err(ConfigError::RebalanceThresholdOutOfRange {
            rebalance_threshold: raw.rebalance_threshold,
        });
    }
    if !(0.0..=1.0).contains(&raw.max_bond_weight) {
        return Err(ConfigError::MaxBondWeightOutOfRange { max_bond_weight: raw.max_bond_weight });
    }

    let u = &raw.universe;
    let symbols = [
        &u.primary_equity,
        &u.leveraged_equity,
        &u.long_duration_defensive,
        &u.inverse_duration_defensive,
        &u.cash_symbol,
    ];
    for s in symbols {
        if s.trim().is_empty() {
            return Err(ConfigError::EmptyUniverseSymbol);
        }
    }
    let mut seen = std::collections::BTreeSet::new();
    for s in [&u.primary_equity, &u.leveraged_equity, &u.long_duration_defensive, &u.inverse_duration_defensive] {
        if !seen.insert(s.as_str()) {
            return Err(ConfigError::DuplicateUniverseSymbol { symbol: s.clone() });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UniverseConfig;

    fn valid_raw() -> RawConfig {
        RawConfig {
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
            leverage_scalar: 1.0,
            rebalance_threshold: 0.025,
            allow_treasury: true,
            bond_sma_fast: 10,
            bond_sma_slow: 30,
            max_bond_weight: 0.4,
            commission_per_share_micros: 0,
            slippage_percent: 0.0,
            initial_capital_micros: 1_000_000_000_000,
            safety_margin: 0,
            universe: UniverseConfig {
                primary_equity: "SPY".into(),
                leveraged_equity: "UPRO".into(),
                long_duration_defensive: "TLT".into(),
                inverse_duration_defensive: "TBF".into(),
                cash_symbol: "CASH".into(),
                bond_trend_proxy: "TLT".into(),
            },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&valid_raw()).is_ok());
    }

    #[test]
    fn threshold_inversion_rejected() {
        let mut raw = valid_raw();
        raw.lower_thresh_z = 2.0;
        raw.upper_thresh_z = 1.0;
        assert!(matches!(validate(&raw), Err(ConfigError::ThresholdInversion { .. })));
    }

    #[test]
    fn duplicate_universe_symbol_rejected() {
        let mut raw = valid_raw();
        raw.universe.leveraged_equity = raw.universe.primary_equity.clone();
        assert!(matches!(validate(&raw), Err(ConfigError::DuplicateUniverseSymbol { .. })));
    }

    #[test]
    fn non_positive_capital_rejected() {
        let mut raw = valid_raw();
        raw.initial_capital_micros = 0;
        assert!(matches!(validate(&raw), Err(ConfigError::NonPositiveCapital { .. })));
    }
}
