//! Synthetic bar generators for the concrete scenarios in the spec's
//! testable-properties section. Every series is produced by a closed-form
//! formula — no randomness — so a generated scenario is reproducible byte
//! for byte across runs and across machines.

use regime_data::{Bar, Timeframe};

const MICROS: f64 = 1_000_000.0;

fn to_micros(price: f64) -> i64 {
    (price * MICROS).round() as i64
}

/// One OHLC bar per closing price, with open = previous close (or the first
/// close on bar 0) and high/low the min/max of open and close. Volume is
/// pinned constant; every bar is complete.
fn bars_from_closes(symbol: &str, start_ts: i64, timeframe: Timeframe, closes: &[f64], volume: i64) -> Vec<Bar> {
    let mut out = Vec::with_capacity(closes.len());
    let mut prev_close = closes.first().copied().unwrap_or(0.0);
    for (i, &close) in closes.iter().enumerate() {
        let open = if i == 0 { close } else { prev_close };
        let high = open.max(close);
        let low = open.min(close);
        let end_ts = start_ts + (i as i64) * timeframe.seconds();
        out.push(
            Bar::new(symbol, timeframe, end_ts, to_micros(open), to_micros(high), to_micros(low), to_micros(close), volume, true)
                .expect("generated bar must satisfy OHLC invariants"),
        );
        prev_close = close;
    }
    out
}

/// Scenario 1: a flat market — constant close, constant volume.
pub fn flat_market(symbol: &str, n: usize, close: f64, volume: i64) -> Vec<Bar> {
    let closes = vec![close; n];
    bars_from_closes(symbol, timeframe_start(), Timeframe::DAILY, &closes, volume)
}

/// Scenario 2: a monotone uptrend, `close(i) = start + slope * i`.
pub fn monotone_trend(symbol: &str, n: usize, start: f64, slope: f64, volume: i64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..n).map(|i| start + slope * i as f64).collect();
    bars_from_closes(symbol, timeframe_start(), Timeframe::DAILY, &closes, volume)
}

/// Scenario 3: `quiet_n` bars alternating by `±quiet_daily_move` around
/// `start` (a small, stable daily move gives a low, stable realized vol),
/// followed by `shock_n` bars alternating by `±shock_daily_move` (a much
/// larger move spikes realized vol past the hysteresis band).
pub fn quiet_then_shock(symbol: &str, start: f64, quiet_n: usize, quiet_daily_move: f64, shock_n: usize, shock_daily_move: f64, volume: i64) -> Vec<Bar> {
    let mut closes = Vec::with_capacity(quiet_n + shock_n);
    let mut price = start;
    closes.push(price);
    for i in 1..quiet_n {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        price *= 1.0 + sign * quiet_daily_move;
        closes.push(price);
    }
    for i in 0..shock_n {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        price *= 1.0 + sign * shock_daily_move;
        closes.push(price);
    }
    bars_from_closes(symbol, timeframe_start(), Timeframe::DAILY, &closes, volume)
}

/// Scenario 4: a vol spike (`spike_n` bars of `±spike_daily_move`) followed
/// by `crush_n` bars whose daily move decays geometrically toward zero —
/// realized vol measured over the trailing window drops sharply, tripping
/// the vol-crush override.
pub fn spike_then_crush(symbol: &str, start: f64, lead_in_n: usize, lead_in_move: f64, spike_n: usize, spike_daily_move: f64, crush_n: usize, volume: i64) -> Vec<Bar> {
    let mut closes = Vec::with_capacity(lead_in_n + spike_n + crush_n);
    let mut price = start;
    closes.push(price);
    for i in 1..lead_in_n {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        price *= 1.0 + sign * lead_in_move;
        closes.push(price);
    }
    for i in 0..spike_n {
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        price *= 1.0 + sign * spike_daily_move;
        closes.push(price);
    }
    let mut decay_move = spike_daily_move;
    for i in 0..crush_n {
        decay_move *= 0.5;
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        price *= 1.0 + sign * decay_move;
        closes.push(price);
    }
    bars_from_closes(symbol, timeframe_start(), Timeframe::DAILY, &closes, volume)
}

fn timeframe_start() -> i64 {
    // Arbitrary but fixed epoch; only relative ordering and spacing matter.
    1_700_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_market_has_constant_close() {
        let bars = flat_market("SPY", 10, 100.0, 1_000);
        assert!(bars.iter().all(|b| b.close_micros == 100_000_000));
    }

    #[test]
    fn monotone_trend_is_strictly_increasing() {
        let bars = monotone_trend("SPY", 10, 100.0, 0.5, 1_000);
        for w in bars.windows(2) {
            assert!(w[1].close_micros > w[0].close_micros);
        }
    }

    #[test]
    fn quiet_then_shock_has_larger_moves_in_shock_tail() {
        let bars = quiet_then_shock("SPY", 100.0, 20, 0.005, 10, 0.05, 1_000);
        let quiet_move = (bars[1].close_micros - bars[0].close_micros).abs();
        let shock_move = (bars[29].close_micros - bars[28].close_micros).abs();
        assert!(shock_move > quiet_move * 5);
    }

    #[test]
    fn every_generated_bar_is_complete_and_ordered() {
        let bars = spike_then_crush("SPY", 100.0, 10, 0.005, 5, 0.05, 5, 1_000);
        assert!(bars.iter().all(|b| b.is_complete));
        for w in bars.windows(2) {
            assert!(w[1].end_ts > w[0].end_ts);
        }
    }
}
