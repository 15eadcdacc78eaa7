//! Exposure and equity metrics derived from first principles — never
//! accumulated incrementally, so a snapshot always reflects the portfolio's
//! actual current state rather than a running total that could drift.

use crate::fixedpoint::{i128_to_i64_clamp, Micros};
use crate::types::PortfolioState;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExposureMetrics {
    pub gross_exposure: Micros,
    pub net_exposure: Micros,
}

/// Gross and net exposure across all open positions, computed via `i128`
/// intermediates so summing many large positions can't overflow before the
/// final clamp back to `i64`.
pub fn compute_exposure_micros(portfolio: &PortfolioState) -> ExposureMetrics {
    let mut gross: i128 = 0;
    let mut net: i128 = 0;
    for pos in portfolio.positions.values() {
        let value = pos.current_price.raw() as i128 * pos.quantity as i128;
        gross += value.abs();
        net += value;
    }
    ExposureMetrics {
        gross_exposure: Micros::new(i128_to_i64_clamp(gross)),
        net_exposure: Micros::new(i128_to_i64_clamp(net)),
    }
}

pub fn compute_unrealized_pnl_micros(portfolio: &PortfolioState) -> Micros {
    let mut total: i128 = 0;
    for pos in portfolio.positions.values() {
        let delta = pos.current_price.raw() as i128 - pos.average_entry_price.raw() as i128;
        total += delta * pos.quantity as i128;
    }
    Micros::new(i128_to_i64_clamp(total))
}

/// `total_equity` recomputed from cash + mark-to-market position values —
/// never from a running delta.
pub fn compute_equity_micros(portfolio: &PortfolioState) -> Micros {
    let mut total: i128 = portfolio.cash.raw() as i128;
    for pos in portfolio.positions.values() {
        total += pos.current_price.raw() as i128 * pos.quantity as i128;
    }
    Micros::new(i128_to_i64_clamp(total))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExposureBreach {
    pub gross_exposure: i64,
    pub limit: i64,
}

/// Gross-exposure cap, expressed as a multiple of total equity (e.g. `2.0`
/// for 2x gross leverage). Returns the breach detail if exceeded.
pub fn enforce_max_gross_exposure(
    portfolio: &PortfolioState,
    max_gross_multiple: f64,
) -> Option<ExposureBreach> {
    let equity = compute_equity_micros(portfolio);
    if equity.raw() <= 0 {
        return None;
    }
    let limit = (equity.raw() as f64 * max_gross_multiple) as i64;
    let gross = compute_exposure_micros(portfolio).gross_exposure.raw();
    if gross > limit {
        Some(ExposureBreach {
            gross_exposure: gross,
            limit,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn portfolio_with(qty: i64, price: i64, cash: i64) -> PortfolioState {
        let mut pf = PortfolioState::new(Micros::new(cash));
        pf.cash = Micros::new(cash);
        pf.positions.insert(
            "AAPL".into(),
            Position {
                symbol: "AAPL".into(),
                quantity: qty,
                average_entry_price: Micros::new(price),
                current_price: Micros::new(price),
            },
        );
        pf
    }

    #[test]
    fn exposure_is_signed_net_unsigned_gross() {
        let pf = portfolio_with(-10, 100_000_000, 0);
        let m = compute_exposure_micros(&pf);
        assert_eq!(m.gross_exposure, Micros::new(1_000_000_000));
        assert_eq!(m.net_exposure, Micros::new(-1_000_000_000));
    }

    #[test]
    fn equity_matches_cash_plus_positions() {
        let pf = portfolio_with(10, 100_000_000, 500_000_000);
        assert_eq!(compute_equity_micros(&pf), Micros::new(1_500_000_000));
    }

    #[test]
    fn breach_detected_over_limit() {
        let mut pf = portfolio_with(10, 100_000_000, 500_000_000);
        pf.positions.get_mut("AAPL").unwrap().quantity = 1000;
        let breach = enforce_max_gross_exposure(&pf, 1.0);
        assert!(breach.is_some());
    }

    #[test]
    fn no_breach_within_limit() {
        let pf = portfolio_with(1, 100_000_000, 500_000_000);
        assert!(enforce_max_gross_exposure(&pf, 2.0).is_none());
    }
}
