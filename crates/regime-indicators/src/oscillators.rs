//! RSI, MACD, stochastic oscillator, OBV, and ADX.

use crate::{ema_series, sma, IndicatorValue};

/// RSI via Wilder's smoothing. Undefined for the first `n` closes.
pub fn rsi(closes: &[f64], n: usize) -> IndicatorValue {
    if n == 0 || closes.len() < n + 1 {
        return IndicatorValue::undefined();
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let (sum_gain, sum_loss) = deltas[..n].iter().fold((0.0, 0.0), |(g, l), &d| {
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l + d.abs())
        }
    });
    let nf = n as f64;
    let mut avg_gain = sum_gain / nf;
    let mut avg_loss = sum_loss / nf;

    for &d in &deltas[n..] {
        let gain = d.max(0.0);
        let loss = (-d).max(0.0);
        avg_gain = (avg_gain * (nf - 1.0) + gain) / nf;
        avg_loss = (avg_loss * (nf - 1.0) + loss) / nf;
    }

    let value = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };
    IndicatorValue::defined(value)
}

/// MACD line, signal line, and histogram.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// `macd(closes, fast, slow, signal)`. Undefined until the slow EMA and the
/// signal EMA (computed over the MACD line) both have enough history.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdOutput> {
    if slow == 0 || fast == 0 || signal == 0 || closes.len() < slow + signal {
        return None;
    }
    let fast_series = ema_series(closes, fast);
    let slow_series = ema_series(closes, slow);

    let macd_line: Vec<f64> = fast_series
        .iter()
        .zip(slow_series.iter())
        .filter_map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    if macd_line.len() < signal {
        return None;
    }
    let signal_series = ema_series(&macd_line, signal);
    let signal_val = *signal_series.last()?;
    let signal_val = signal_val?;
    let macd_val = *macd_line.last()?;

    Some(MacdOutput {
        macd: macd_val,
        signal: signal_val,
        histogram: macd_val - signal_val,
    })
}

/// Stochastic oscillator `%K`/`%D`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StochasticOutput {
    pub percent_k: f64,
    pub percent_d: f64,
}

/// `stochastic(highs, lows, closes, k_period, d_period)`.
pub fn stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> Option<StochasticOutput> {
    if k_period == 0 || d_period == 0 {
        return None;
    }
    let n = closes.len();
    if n < k_period + d_period - 1 {
        return None;
    }

    let mut k_values = Vec::with_capacity(n - k_period + 1);
    for end in k_period..=n {
        let window_highs = &highs[end - k_period..end];
        let window_lows = &lows[end - k_period..end];
        let hh = window_highs.iter().cloned().fold(f64::MIN, f64::max);
        let ll = window_lows.iter().cloned().fold(f64::MAX, f64::min);
        let close = closes[end - 1];
        let k = if (hh - ll).abs() < f64::EPSILON {
            50.0
        } else {
            (close - ll) / (hh - ll) * 100.0
        };
        k_values.push(k);
    }

    if k_values.len() < d_period {
        return None;
    }
    let d = sma(&k_values, d_period)?;
    let k = *k_values.last()?;

    Some(StochasticOutput {
        percent_k: k,
        percent_d: d,
    })
}

/// On-balance volume, cumulative over the full input.
pub fn obv(closes: &[f64], volumes: &[f64]) -> f64 {
    if closes.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 1..closes.len() {
        if closes[i] > closes[i - 1] {
            total += volumes[i];
        } else if closes[i] < closes[i - 1] {
            total -= volumes[i];
        }
    }
    total
}

/// Average Directional Index output: ADX plus the +DI/-DI components it is
/// built from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdxOutput {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Wilder's ADX over `n` periods. Undefined until `2n` bars of history exist
/// (n to seed the directional movement averages, n more to seed the ADX
/// average of the DX series).
pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], n: usize) -> Option<AdxOutput> {
    if n == 0 || closes.len() < 2 * n + 1 {
        return None;
    }

    let mut plus_dm = Vec::with_capacity(closes.len() - 1);
    let mut minus_dm = Vec::with_capacity(closes.len() - 1);
    let mut tr = Vec::with_capacity(closes.len() - 1);

    for i in 1..closes.len() {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];

        let pdm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let mdm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };
        plus_dm.push(pdm);
        minus_dm.push(mdm);

        let true_range = crate::true_range(highs[i], lows[i], closes[i - 1]);
        tr.push(true_range);
    }

    let wilder_smooth = |series: &[f64], n: usize| -> Vec<f64> {
        if series.len() < n {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(series.len() - n + 1);
        let seed: f64 = series[..n].iter().sum();
        out.push(seed);
        let mut prev = seed;
        for &v in &series[n..] {
            let cur = prev - prev / n as f64 + v;
            out.push(cur);
            prev = cur;
        }
        out
    };

    let smoothed_tr = wilder_smooth(&tr, n);
    let smoothed_plus = wilder_smooth(&plus_dm, n);
    let smoothed_minus = wilder_smooth(&minus_dm, n);

    let len = smoothed_tr.len().min(smoothed_plus.len()).min(smoothed_minus.len());
    if len == 0 {
        return None;
    }

    let mut dx_series = Vec::with_capacity(len);
    let mut plus_di_last = 0.0;
    let mut minus_di_last = 0.0;
    for i in 0..len {
        let str_ = smoothed_tr[i];
        if str_.abs() < f64::EPSILON {
            dx_series.push(0.0);
            continue;
        }
        let plus_di = 100.0 * smoothed_plus[i] / str_;
        let minus_di = 100.0 * smoothed_minus[i] / str_;
        plus_di_last = plus_di;
        minus_di_last = minus_di;
        let sum = plus_di + minus_di;
        let dx = if sum.abs() < f64::EPSILON {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / sum
        };
        dx_series.push(dx);
    }

    if dx_series.len() < n {
        return None;
    }
    let adx_val = sma(&dx_series, n)?;

    Some(AdxOutput {
        adx: adx_val,
        plus_di: plus_di_last,
        minus_di: minus_di_last,
    })
}
