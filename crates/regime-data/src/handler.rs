//! In-memory Data Handler: ordered iteration plus a bounded, no-lookahead
//! history query.

use std::collections::BTreeMap;

use crate::types::{Bar, Timeframe};

/// Fatal data errors. All three abort the run; the handler never
/// silently interpolates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    DataMissing { symbol: String },
    DataGap { symbol: String, at_ts: i64 },
    DataCorrupt { symbol: String, at_ts: i64 },
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::DataMissing { symbol } => write!(f, "data missing for symbol {symbol}"),
            DataError::DataGap { symbol, at_ts } => {
                write!(f, "data gap for {symbol} at or before ts {at_ts}")
            }
            DataError::DataCorrupt { symbol, at_ts } => {
                write!(f, "non-monotonic timestamp for {symbol} at ts {at_ts}")
            }
        }
    }
}

impl std::error::Error for DataError {}

/// An in-memory implementation of the Data Handler contract: an ordered,
/// deduplicated stream of bars with a bounded, causal lookback query.
///
/// Bars are keyed by `(symbol, timeframe, end_ts)`; inserting a duplicate key
/// overwrites silently is disallowed — [`InMemoryDataHandler::insert`]
/// returns an error instead, since the spec requires the triple be unique.
pub struct InMemoryDataHandler {
    bars: BTreeMap<(String, i64, i64), Bar>,
    gap_tolerance_bars: u32,
}

impl InMemoryDataHandler {
    pub fn new(gap_tolerance_bars: u32) -> Self {
        Self {
            bars: BTreeMap::new(),
            gap_tolerance_bars,
        }
    }

    /// Insert a bar. Returns `false` if a bar with the same
    /// `(symbol, timeframe, end_ts)` already exists (the triple must stay
    /// unique).
    pub fn insert(&mut self, bar: Bar) -> bool {
        let key = (bar.symbol.clone(), bar.timeframe.seconds(), bar.end_ts);
        if self.bars.contains_key(&key) {
            return false;
        }
        self.bars.insert(key, bar);
        true
    }

    /// Ordered iteration over `[start, end]` for one symbol/timeframe.
    ///
    /// Ascending timestamp order; ties across symbols are impossible here
    /// since this query is already scoped to a single symbol.
    pub fn iterate(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: i64,
        end: i64,
    ) -> Result<Vec<&Bar>, DataError> {
        let mut out: Vec<&Bar> = self
            .bars
            .range((symbol.to_string(), timeframe.seconds(), start)..=(symbol.to_string(), timeframe.seconds(), end))
            .map(|(_, b)| b)
            .collect();

        if out.is_empty() {
            return Err(DataError::DataMissing {
                symbol: symbol.to_string(),
            });
        }

        out.sort_by_key(|b| b.end_ts);
        self.check_monotonic_and_gaps(symbol, timeframe, &out)?;
        Ok(out)
    }

    /// Bounded-history query: the most recent `≤ max_count` bars with
    /// `end_ts ≤ cutoff_ts`. Never returns a bar strictly later than the
    /// cutoff — this is the only permitted lookback mechanism.
    pub fn history(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        cutoff_ts: i64,
        max_count: usize,
    ) -> Vec<&Bar> {
        let mut out: Vec<&Bar> = self
            .bars
            .range((symbol.to_string(), timeframe.seconds(), i64::MIN)..=(symbol.to_string(), timeframe.seconds(), cutoff_ts))
            .map(|(_, b)| b)
            .collect();
        out.sort_by_key(|b| b.end_ts);
        debug_assert!(out.iter().all(|b| b.end_ts <= cutoff_ts));
        if out.len() > max_count {
            out.split_off(out.len() - max_count)
        } else {
            out
        }
    }

    fn check_monotonic_and_gaps(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[&Bar],
    ) -> Result<(), DataError> {
        let step = timeframe.seconds();
        for w in bars.windows(2) {
            let (a, b) = (w[0], w[1]);
            if b.end_ts <= a.end_ts {
                return Err(DataError::DataCorrupt {
                    symbol: symbol.to_string(),
                    at_ts: b.end_ts,
                });
            }
            let missing_bars = (b.end_ts - a.end_ts) / step - 1;
            if missing_bars > self.gap_tolerance_bars as i64 {
                return Err(DataError::DataGap {
                    symbol: symbol.to_string(),
                    at_ts: b.end_ts,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(symbol: &str, end_ts: i64, close: i64) -> Bar {
        Bar::new(symbol, Timeframe::DAILY, end_ts, close, close, close, close, 100, true).unwrap()
    }

    #[test]
    fn missing_symbol_is_rejected() {
        let handler = InMemoryDataHandler::new(0);
        let err = handler
            .iterate("AAPL", Timeframe::DAILY, 0, 1_000_000)
            .unwrap_err();
        assert_eq!(err, DataError::DataMissing { symbol: "AAPL".into() });
    }

    #[test]
    fn history_never_returns_past_cutoff() {
        let mut handler = InMemoryDataHandler::new(0);
        for i in 0..5 {
            handler.insert(bar("AAPL", i * 86_400, 100 + i));
        }
        let h = handler.history("AAPL", Timeframe::DAILY, 2 * 86_400, 10);
        assert!(h.iter().all(|b| b.end_ts <= 2 * 86_400));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn history_respects_max_count() {
        let mut handler = InMemoryDataHandler::new(0);
        for i in 0..10 {
            handler.insert(bar("AAPL", i * 86_400, 100 + i));
        }
        let h = handler.history("AAPL", Timeframe::DAILY, 9 * 86_400, 3);
        assert_eq!(h.len(), 3);
        assert_eq!(h.last().unwrap().end_ts, 9 * 86_400);
    }

    #[test]
    fn gap_beyond_tolerance_is_rejected() {
        let mut handler = InMemoryDataHandler::new(0);
        handler.insert(bar("AAPL", 0, 100));
        handler.insert(bar("AAPL", 3 * 86_400, 103));
        let err = handler.iterate("AAPL", Timeframe::DAILY, 0, 10 * 86_400).unwrap_err();
        assert!(matches!(err, DataError::DataGap { .. }));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut handler = InMemoryDataHandler::new(0);
        assert!(handler.insert(bar("AAPL", 0, 100)));
        assert!(!handler.insert(bar("AAPL", 0, 101)));
    }
}
