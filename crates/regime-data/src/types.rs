use serde::{Deserialize, Serialize};

/// Seconds-per-bar newtype. Prevents daily (`86_400`) and other resolutions
/// from being silently confused with a bare `i64`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timeframe(pub i64);

impl Timeframe {
    pub const DAILY: Timeframe = Timeframe(86_400);

    pub fn seconds(&self) -> i64 {
        self.0
    }
}

/// The atomic observation: one OHLCV bar for one symbol over one timeframe.
///
/// Prices and volume are fixed-point integer micros (scale documented in
/// `regime-portfolio::MICROS_SCALE`) — never binary floats — so equality and
/// ordering on raw bar data are exact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub end_ts: i64,
    pub open_micros: i64,
    pub high_micros: i64,
    pub low_micros: i64,
    pub close_micros: i64,
    pub volume: i64,
    pub is_complete: bool,
}

/// Errors raised when constructing a [`Bar`] that would violate the OHLC
/// invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarInvariantError {
    LowAboveHigh,
    OpenOutsideRange,
    CloseOutsideRange,
    NegativeVolume,
}

impl std::fmt::Display for BarInvariantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarInvariantError::LowAboveHigh => write!(f, "low is greater than high"),
            BarInvariantError::OpenOutsideRange => write!(f, "open is outside [low, high]"),
            BarInvariantError::CloseOutsideRange => write!(f, "close is outside [low, high]"),
            BarInvariantError::NegativeVolume => write!(f, "volume is negative"),
        }
    }
}

impl std::error::Error for BarInvariantError {}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        end_ts: i64,
        open_micros: i64,
        high_micros: i64,
        low_micros: i64,
        close_micros: i64,
        volume: i64,
        is_complete: bool,
    ) -> Result<Self, BarInvariantError> {
        if low_micros > high_micros {
            return Err(BarInvariantError::LowAboveHigh);
        }
        if open_micros < low_micros || open_micros > high_micros {
            return Err(BarInvariantError::OpenOutsideRange);
        }
        if close_micros < low_micros || close_micros > high_micros {
            return Err(BarInvariantError::CloseOutsideRange);
        }
        if volume < 0 {
            return Err(BarInvariantError::NegativeVolume);
        }
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            end_ts,
            open_micros,
            high_micros,
            low_micros,
            close_micros,
            volume,
            is_complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_low_above_high() {
        let err = Bar::new("A", Timeframe::DAILY, 0, 10, 5, 6, 8, 100, true).unwrap_err();
        assert_eq!(err, BarInvariantError::LowAboveHigh);
    }

    #[test]
    fn rejects_close_outside_range() {
        let err = Bar::new("A", Timeframe::DAILY, 0, 5, 10, 4, 20, 100, true).unwrap_err();
        assert_eq!(err, BarInvariantError::CloseOutsideRange);
    }

    #[test]
    fn accepts_valid_bar() {
        let bar = Bar::new("A", Timeframe::DAILY, 0, 5, 10, 4, 8, 100, true).unwrap();
        assert_eq!(bar.symbol, "A");
    }
}
