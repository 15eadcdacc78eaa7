//! ATR, Bollinger bands, realized volatility, and rolling z-score.

/// True range for a single bar given the prior close.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    let a = high - low;
    let b = (high - prev_close).abs();
    let c = (low - prev_close).abs();
    a.max(b).max(c)
}

/// Average true range via Wilder smoothing over `n` periods.
///
/// Undefined until `n + 1` bars exist (the first true-range value needs a
/// prior close).
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], n: usize) -> Option<f64> {
    if n == 0 || closes.len() < n + 1 {
        return None;
    }
    let trs: Vec<f64> = (1..closes.len())
        .map(|i| true_range(highs[i], lows[i], closes[i - 1]))
        .collect();

    if trs.len() < n {
        return None;
    }
    let seed: f64 = trs[..n].iter().sum::<f64>() / n as f64;
    let mut prev = seed;
    for &tr in &trs[n..] {
        prev = (prev * (n as f64 - 1.0) + tr) / n as f64;
    }
    Some(prev)
}

/// Bollinger band output: the middle SMA plus the upper/lower bands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BollingerBands {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Bollinger bands: `n`-period SMA ± `k` population standard deviations.
pub fn bollinger(closes: &[f64], n: usize, k: f64) -> Option<BollingerBands> {
    if n == 0 || closes.len() < n {
        return None;
    }
    let window = &closes[closes.len() - n..];
    let mean = window.iter().sum::<f64>() / n as f64;
    let variance = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    Some(BollingerBands {
        middle: mean,
        upper: mean + k * std,
        lower: mean - k * std,
    })
}

/// Annualized realized volatility: std-dev of log returns over `lookback`
/// bars, scaled by `sqrt(252)`.
///
/// Uses population standard deviation (the whole window is the population,
/// not a sample drawn from it — consistent with `rolling_zscore`'s
/// population correction below).
pub fn realized_volatility(closes: &[f64], lookback: usize) -> Option<f64> {
    if lookback == 0 || closes.len() < lookback + 1 {
        return None;
    }
    let window = &closes[closes.len() - lookback - 1..];
    let log_returns: Vec<f64> = window.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    if log_returns.is_empty() {
        return None;
    }
    let mean = log_returns.iter().sum::<f64>() / log_returns.len() as f64;
    let variance = log_returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / log_returns.len() as f64;
    Some(variance.sqrt() * (252.0_f64).sqrt())
}

/// `(value - rolling_mean) / rolling_std` over the trailing `window` entries
/// of `series`, using the population standard-deviation correction
/// (divide by `n`, not `n-1`).
///
/// `None` if there isn't a full window of history, or if the window's
/// standard deviation is zero (constant series — z-score is undefined, not
/// infinite).
pub fn rolling_zscore(series: &[f64], window: usize) -> Option<f64> {
    if window == 0 || series.len() < window {
        return None;
    }
    let w = &series[series.len() - window..];
    let mean = w.iter().sum::<f64>() / window as f64;
    let variance = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window as f64;
    let std = variance.sqrt();
    if std.abs() < f64::EPSILON {
        return None;
    }
    let value = *series.last()?;
    Some((value - mean) / std)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_range_basic() {
        assert_eq!(true_range(10.0, 8.0, 9.0), 2.0);
        assert_eq!(true_range(10.0, 9.5, 5.0), 5.0);
    }

    #[test]
    fn atr_flat_series_is_zero() {
        let highs = vec![101.0; 20];
        let lows = vec![99.0; 20];
        let closes = vec![100.0; 20];
        let v = atr(&highs, &lows, &closes, 14).unwrap();
        assert!((v - 2.0).abs() < 1e-9);
    }

    #[test]
    fn bollinger_flat_series_has_zero_width() {
        let closes = vec![50.0; 20];
        let bb = bollinger(&closes, 20, 2.0).unwrap();
        assert_eq!(bb.middle, 50.0);
        assert_eq!(bb.upper, 50.0);
        assert_eq!(bb.lower, 50.0);
    }

    #[test]
    fn realized_vol_flat_series_is_zero() {
        let closes = vec![100.0; 50];
        assert_eq!(realized_volatility(&closes, 20), Some(0.0));
    }

    #[test]
    fn rolling_zscore_constant_series_is_none() {
        let series = vec![1.0; 30];
        assert_eq!(rolling_zscore(&series, 10), None);
    }

    #[test]
    fn rolling_zscore_basic() {
        let mut series = vec![0.0; 9];
        series.push(10.0);
        // window of 10: nine zeros + a ten. mean=1, pop var = (9*1+81)/10=9, std=3
        let z = rolling_zscore(&series, 10).unwrap();
        assert!((z - 3.0).abs() < 1e-9);
    }
}
