//! regime-indicators
//!
//! Stateless functions over a finite prefix of OHLC closes: moving averages,
//! oscillators, volatility estimators, and a 1D Kalman trend filter.
//!
//! Every function here is pure: no internal state is kept between calls, and
//! none of them read the clock, touch storage, or allocate beyond the
//! returned series. Callers own any caching of indicator history.
//!
//! Outputs that would otherwise need `n-1` bars of warmup are represented as
//! [`IndicatorValue::Undefined`] rather than `NaN` or `0.0`, so "insufficient
//! history" is a value the caller must explicitly match on.

mod kalman;
mod oscillators;
mod volatility;

pub use kalman::{kalman_trend, KalmanConfig, KalmanTrend};
pub use oscillators::{adx, macd, obv, rsi, stochastic, AdxOutput, MacdOutput, StochasticOutput};
pub use volatility::{atr, bollinger, realized_volatility, rolling_zscore, true_range, BollingerBands};

/// A single indicator reading that may be undefined for early bars.
///
/// Using a sentinel type instead of `f64::NAN` keeps "not enough history yet"
/// a value the caller is forced to handle rather than a float that silently
/// poisons arithmetic downstream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IndicatorValue {
    Defined(f64),
    Undefined,
}

impl IndicatorValue {
    pub fn undefined() -> Self {
        IndicatorValue::Undefined
    }

    pub fn defined(v: f64) -> Self {
        IndicatorValue::Defined(v)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            IndicatorValue::Defined(v) => Some(*v),
            IndicatorValue::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, IndicatorValue::Defined(_))
    }
}

/// Round a value to `places` decimal digits.
///
/// Every indicator output that feeds a threshold or equality comparison
/// (regime classifier z-scores, `T_norm`) must pass through this before
/// comparison, so two runs that differ only in floating-point rounding noise
/// still classify identically.
pub fn round_to_precision(x: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (x * scale).round() / scale
}

/// Simple moving average of the last `n` closes.
///
/// `None` if `closes.len() < n` or `n == 0`.
pub fn sma(closes: &[f64], n: usize) -> Option<f64> {
    if n == 0 || closes.len() < n {
        return None;
    }
    let window = &closes[closes.len() - n..];
    Some(window.iter().sum::<f64>() / n as f64)
}

/// Full simple-moving-average series. `series[i]` is `None` for `i < n-1`.
pub fn sma_series(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    if n == 0 {
        return vec![None; closes.len()];
    }
    let mut out = Vec::with_capacity(closes.len());
    let mut window_sum = 0.0f64;
    for (i, &c) in closes.iter().enumerate() {
        window_sum += c;
        if i >= n {
            window_sum -= closes[i - n];
        }
        if i + 1 >= n {
            out.push(Some(window_sum / n as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Exponential moving average of `closes` with span `n`.
///
/// `alpha = 2 / (n + 1)`. The first `n` values seed the EMA via their SMA
/// (documented choice — EMA seeding varies across sources; this crate pins
/// SMA-seeding rather than seeding from the first close alone).
pub fn ema(closes: &[f64], n: usize) -> Option<f64> {
    ema_series(closes, n).into_iter().last().flatten()
}

/// Full EMA series, `None` for indices before the seed SMA is available.
pub fn ema_series(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    if n == 0 || closes.len() < n {
        return vec![None; closes.len()];
    }
    let alpha = 2.0 / (n as f64 + 1.0);
    let mut out = vec![None; closes.len()];

    let seed = closes[..n].iter().sum::<f64>() / n as f64;
    out[n - 1] = Some(seed);

    let mut prev = seed;
    for i in n..closes.len() {
        let cur = alpha * closes[i] + (1.0 - alpha) * prev;
        out[i] = Some(cur);
        prev = cur;
    }
    out
}
