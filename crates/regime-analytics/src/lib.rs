//! regime-analytics
//!
//! The Performance Analyzer: turns an equity series into the fixed set of
//! summary metrics a backtest report exposes. Every computation here is
//! deterministic and closed-form — no resampling, no Monte Carlo, no
//! random seeding — so the same equity series always yields the same
//! report.
//!
//! Win rate and profit factor are computed over daily returns (a day is a
//! "win" if its return is positive) rather than over paired round-trip
//! trades: the ledger records individual fills, not matched entry/exit
//! pairs, and average-cost accounting doesn't preserve a 1:1 buy/sell
//! correspondence to pair them against.

use regime_backtest::BacktestReport;
use regime_portfolio::Micros;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_vol: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown: f64,
    pub calmar: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
}

/// Daily risk-free rate used as the Sharpe/Sortino excess-return baseline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyticsConfig {
    pub daily_risk_free_rate: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self { daily_risk_free_rate: 0.0 }
    }
}

fn daily_returns(equity_series: &[(i64, Micros)]) -> Vec<f64> {
    let mut out = Vec::with_capacity(equity_series.len().saturating_sub(1));
    for w in equity_series.windows(2) {
        let prev = w[0].1.raw() as f64;
        let cur = w[1].1.raw() as f64;
        if prev > 0.0 {
            out.push((cur - prev) / prev);
        }
    }
    out
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn population_std(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

fn max_drawdown(equity_series: &[(i64, Micros)]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;
    for &(_, eq) in equity_series {
        let v = eq.raw() as f64;
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Nearest-rank percentile — deterministic, no interpolation, so reruns on
/// identical data always pick the same sample.
fn nearest_rank_percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    sorted[idx]
}

/// Compute the full performance report from a backtest's equity series.
pub fn analyze(report: &BacktestReport, cfg: &AnalyticsConfig) -> PerformanceReport {
    analyze_equity_series(&report.equity_series, cfg)
}

pub fn analyze_equity_series(equity_series: &[(i64, Micros)], cfg: &AnalyticsConfig) -> PerformanceReport {
    if equity_series.len() < 2 {
        return PerformanceReport {
            total_return: 0.0,
            cagr: 0.0,
            annualized_vol: 0.0,
            sharpe: 0.0,
            sortino: 0.0,
            max_drawdown: 0.0,
            calmar: 0.0,
            var_95: 0.0,
            cvar_95: 0.0,
            win_rate: 0.0,
            profit_factor: 0.0,
        };
    }

    let initial = equity_series[0].1.raw() as f64;
    let final_eq = equity_series[equity_series.len() - 1].1.raw() as f64;
    let total_return = if initial > 0.0 { (final_eq - initial) / initial } else { 0.0 };

    let span_secs = (equity_series[equity_series.len() - 1].0 - equity_series[0].0) as f64;
    let years = (span_secs / SECONDS_PER_DAY / CALENDAR_DAYS_PER_YEAR).max(1.0 / CALENDAR_DAYS_PER_YEAR);
    let cagr = if initial > 0.0 && years > 0.0 {
        (final_eq / initial).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let returns = daily_returns(equity_series);
    let annualized_vol = population_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt();

    let excess: Vec<f64> = returns.iter().map(|r| r - cfg.daily_risk_free_rate).collect();
    let excess_mean = mean(&excess);
    let excess_std = population_std(&excess);
    let sharpe = if excess_std > 0.0 {
        (excess_mean / excess_std) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: Vec<f64> = excess.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std = population_std(&downside);
    let sortino = if downside_std > 0.0 {
        (excess_mean / downside_std) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let max_dd = max_drawdown(equity_series);
    let calmar = if max_dd < 0.0 { cagr / max_dd.abs() } else { 0.0 };

    let mut sorted_returns = returns.clone();
    sorted_returns.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let var_95 = nearest_rank_percentile(&sorted_returns, 5.0);
    let tail: Vec<f64> = sorted_returns.iter().copied().filter(|&r| r <= var_95).collect();
    let cvar_95 = mean(&tail);

    let wins = returns.iter().filter(|&&r| r > 0.0).count();
    let win_rate = if returns.is_empty() { 0.0 } else { wins as f64 / returns.len() as f64 };

    let gains: f64 = returns.iter().filter(|&&r| r > 0.0).sum();
    let losses: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();
    let profit_factor = if losses > 0.0 { gains / losses } else if gains > 0.0 { f64::INFINITY } else { 0.0 };

    PerformanceReport {
        total_return,
        cagr,
        annualized_vol,
        sharpe,
        sortino,
        max_drawdown: max_dd,
        calmar,
        var_95,
        cvar_95,
        win_rate,
        profit_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[i64]) -> Vec<(i64, Micros)> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ((i as i64) * 86_400, Micros::new(v)))
            .collect()
    }

    #[test]
    fn flat_equity_has_zero_return_and_zero_vol() {
        let s = series(&[1_000_000_000; 10]);
        let r = analyze_equity_series(&s, &AnalyticsConfig::default());
        assert_eq!(r.total_return, 0.0);
        assert_eq!(r.annualized_vol, 0.0);
        assert_eq!(r.max_drawdown, 0.0);
    }

    #[test]
    fn monotone_growth_has_positive_cagr_and_no_drawdown() {
        let values: Vec<i64> = (0..300).map(|i| 1_000_000_000 + i * 1_000_000).collect();
        let s = series(&values);
        let r = analyze_equity_series(&s, &AnalyticsConfig::default());
        assert!(r.total_return > 0.0);
        assert!(r.cagr > 0.0);
        assert_eq!(r.max_drawdown, 0.0);
    }

    #[test]
    fn drawdown_detected_on_decline_then_recovery() {
        let mut values = vec![1_000_000_000i64; 5];
        values.extend([900_000_000, 800_000_000, 850_000_000, 1_050_000_000]);
        let s = series(&values);
        let r = analyze_equity_series(&s, &AnalyticsConfig::default());
        assert!(r.max_drawdown < 0.0);
    }

    #[test]
    fn single_point_series_is_all_zero() {
        let s = series(&[1_000_000_000]);
        let r = analyze_equity_series(&s, &AnalyticsConfig::default());
        assert_eq!(r.total_return, 0.0);
        assert_eq!(r.sharpe, 0.0);
    }
}
