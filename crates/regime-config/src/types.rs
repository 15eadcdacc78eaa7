//! The flat configuration surface (§6): every tunable the classifier,
//! allocator, portfolio, and strategy need to run a backtest, in one
//! deserializable shape that mirrors the recognized-options table
//! verbatim — field names match the spec's configuration surface, not
//! the internal structs they eventually build.

use std::collections::BTreeMap;

use regime_classifier::RegimeConfig;
use regime_indicators::KalmanConfig;
use regime_portfolio::allocator::AllocationConfig;
use regime_portfolio::{CommissionModel, Micros};
use regime_strategy::Universe;
use serde::{Deserialize, Serialize};

fn default_safety_margin() -> usize {
    0
}

fn default_kalman() -> KalmanConfig {
    KalmanConfig::default()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawConfig {
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub t_norm_bull_thresh: f64,
    pub t_norm_bear_thresh: f64,
    #[serde(default = "default_t_max")]
    pub t_max: f64,
    pub realized_vol_window: usize,
    pub vol_baseline_window: usize,
    pub upper_thresh_z: f64,
    pub lower_thresh_z: f64,
    pub vol_crush_threshold: f64,
    pub vol_crush_lookback: usize,
    #[serde(default)]
    pub cell1_exit_confirmation_enabled: bool,
    #[serde(default)]
    pub cell1_exit_confirmation_days: u32,
    #[serde(default = "default_kalman")]
    pub kalman: KalmanConfig,

    pub leverage_scalar: f64,
    pub rebalance_threshold: f64,
    #[serde(default)]
    pub allow_treasury: bool,
    pub bond_sma_fast: usize,
    pub bond_sma_slow: usize,
    pub max_bond_weight: f64,

    pub commission_per_share_micros: i64,
    /// Decimal slippage rate (`0.01` = 1%), matching the spec's documented
    /// config field name. Converted to integer basis points when building
    /// `CommissionModel` so fill-price arithmetic never touches a float.
    pub slippage_percent: f64,
    pub initial_capital_micros: i64,

    #[serde(default = "default_safety_margin")]
    pub safety_margin: usize,

    pub universe: UniverseConfig,
}

fn default_t_max() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniverseConfig {
    pub primary_equity: String,
    pub leveraged_equity: String,
    pub long_duration_defensive: String,
    pub inverse_duration_defensive: String,
    pub cash_symbol: String,
    pub bond_trend_proxy: String,
}

impl From<UniverseConfig> for Universe {
    fn from(u: UniverseConfig) -> Self {
        Universe {
            primary_equity: u.primary_equity,
            leveraged_equity: u.leveraged_equity,
            long_duration_defensive: u.long_duration_defensive,
            inverse_duration_defensive: u.inverse_duration_defensive,
            cash_symbol: u.cash_symbol,
            bond_trend_proxy: u.bond_trend_proxy,
        }
    }
}

/// Everything needed to construct a `RegimeStrategy` + `BacktestEngine`,
/// already split into the sub-structs each crate expects.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    pub regime: RegimeConfig,
    pub allocation: AllocationConfig,
    pub costs: CommissionModel,
    pub initial_capital: Micros,
    pub universe: Universe,
    pub bond_sma_fast: usize,
    pub bond_sma_slow: usize,
    pub safety_margin: usize,
    pub allow_treasury: bool,
}

impl From<RawConfig> for ResolvedConfig {
    fn from(raw: RawConfig) -> Self {
        ResolvedConfig {
            regime: RegimeConfig {
                sma_fast: raw.sma_fast,
                sma_slow: raw.sma_slow,
                t_norm_bull_thresh: raw.t_norm_bull_thresh,
                t_norm_bear_thresh: raw.t_norm_bear_thresh,
                t_max: raw.t_max,
                realized_vol_window: raw.realized_vol_window,
                vol_baseline_window: raw.vol_baseline_window,
                upper_thresh_z: raw.upper_thresh_z,
                lower_thresh_z: raw.lower_thresh_z,
                vol_crush_threshold: raw.vol_crush_threshold,
                vol_crush_lookback: raw.vol_crush_lookback,
                cell1_exit_confirmation_enabled: raw.cell1_exit_confirmation_enabled,
                cell1_exit_confirmation_days: raw.cell1_exit_confirmation_days,
                kalman: raw.kalman,
            },
            allocation: AllocationConfig {
                leverage_scalar: raw.leverage_scalar,
                rebalance_threshold: raw.rebalance_threshold,
                max_bond_weight: raw.max_bond_weight,
            },
            costs: CommissionModel {
                commission_per_share: Micros::new(raw.commission_per_share_micros),
                slippage_bps: (raw.slippage_percent * 10_000.0).round() as i64,
            },
            initial_capital: Micros::new(raw.initial_capital_micros),
            universe: raw.universe.into(),
            bond_sma_fast: raw.bond_sma_fast,
            bond_sma_slow: raw.bond_sma_slow,
            safety_margin: raw.safety_margin,
            allow_treasury: raw.allow_treasury,
        }
    }
}

/// Symbol → arbitrary metadata, retained for callers that need to validate
/// the universe against a data source's known symbol list. Not interpreted
/// by this crate.
pub type SymbolMetadata = BTreeMap<String, serde_json::Value>;
