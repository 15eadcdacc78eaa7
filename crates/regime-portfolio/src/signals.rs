//! Reduces a `Signal` (or a full target-weight rebalance) down to concrete
//! BUY/SELL order intents against the current portfolio. This is the step
//! between "the strategy wants X% in this symbol" and the fixed-quantity
//! buy/sell primitives in `accounting`.

use std::collections::BTreeMap;

use crate::fixedpoint::Micros;
use crate::types::{PortfolioState, Side};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalKind {
    Buy,
    Sell,
    BuyPercent,
    SellPercent,
    RebalanceToWeight,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub kind: SignalKind,
    /// Quantity for BUY/SELL, fraction-of-equity for BUY_PERCENT/
    /// SELL_PERCENT/REBALANCE_TO_WEIGHT.
    pub amount: f64,
    pub source_strategy: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
}

/// Reduce a single signal, given the bar's fill price for its symbol and
/// the portfolio's total equity, to a concrete order intent. Returns
/// `None` for a signal that resolves to zero shares (nothing to do).
pub fn resolve_signal(signal: &Signal, fill_price: Micros, total_equity: Micros, portfolio: &PortfolioState) -> Option<OrderIntent> {
    match signal.kind {
        SignalKind::Buy => Some(OrderIntent {
            symbol: signal.symbol.clone(),
            side: Side::Buy,
            qty: signal.amount.floor() as i64,
        }),
        SignalKind::Sell => Some(OrderIntent {
            symbol: signal.symbol.clone(),
            side: Side::Sell,
            qty: signal.amount.floor() as i64,
        }),
        SignalKind::BuyPercent => {
            let target_dollars = signal.amount * (total_equity.raw() as f64 / 1_000_000.0);
            let target_shares = (target_dollars / (fill_price.raw() as f64 / 1_000_000.0)).floor() as i64;
            if target_shares <= 0 {
                None
            } else {
                Some(OrderIntent {
                    symbol: signal.symbol.clone(),
                    side: Side::Buy,
                    qty: target_shares,
                })
            }
        }
        SignalKind::SellPercent => {
            let held = portfolio.positions.get(&signal.symbol).map(|p| p.quantity).unwrap_or(0);
            let target_dollars = signal.amount * (total_equity.raw() as f64 / 1_000_000.0);
            let sell_shares = (target_dollars / (fill_price.raw() as f64 / 1_000_000.0)).floor() as i64;
            let qty = sell_shares.min(held.max(0));
            if qty <= 0 {
                None
            } else {
                Some(OrderIntent {
                    symbol: signal.symbol.clone(),
                    side: Side::Sell,
                    qty,
                })
            }
        }
        SignalKind::RebalanceToWeight => {
            let held = portfolio.positions.get(&signal.symbol).map(|p| p.quantity).unwrap_or(0);
            let target_dollars = signal.amount * (total_equity.raw() as f64 / 1_000_000.0);
            let target_shares = (target_dollars / (fill_price.raw() as f64 / 1_000_000.0)).floor() as i64;
            let delta = target_shares - held;
            if delta == 0 {
                None
            } else if delta > 0 {
                Some(OrderIntent {
                    symbol: signal.symbol.clone(),
                    side: Side::Buy,
                    qty: delta,
                })
            } else {
                Some(OrderIntent {
                    symbol: signal.symbol.clone(),
                    side: Side::Sell,
                    qty: -delta,
                })
            }
        }
    }
}

/// Derive order intents for a full target-weight rebalance across symbols,
/// ordered so every sell is emitted before any buy — sells fund buys within
/// the same rebalance. Within each side, symbols marked `defensive` sort
/// first so safe-haven rotations free cash ahead of other reductions.
///
/// Returns `AllocationError::NonPositiveEquity` if `total_equity` is zero or
/// negative, and `AllocationError::UnknownSymbol` if `targets` names a
/// symbol outside `known_symbols`.
pub fn rebalance_order_intents(
    targets: &BTreeMap<String, f64>,
    prices: &BTreeMap<String, Micros>,
    total_equity: Micros,
    portfolio: &PortfolioState,
    defensive_symbols: &[&str],
    known_symbols: &[&str],
) -> Result<Vec<OrderIntent>, crate::allocator::AllocationError> {
    crate::allocator::check_positive_equity(total_equity.raw())?;
    for symbol in targets.keys() {
        crate::allocator::check_known_symbol(symbol, known_symbols)?;
    }

    let mut sells = Vec::new();
    let mut buys = Vec::new();

    for (symbol, &weight) in targets {
        let Some(&price) = prices.get(symbol) else { continue };
        let held = portfolio.positions.get(symbol).map(|p| p.quantity).unwrap_or(0);
        let target_dollars = weight * (total_equity.raw() as f64 / 1_000_000.0);
        let target_shares = (target_dollars / (price.raw() as f64 / 1_000_000.0)).floor() as i64;
        let delta = target_shares - held;
        if delta == 0 {
            continue;
        }
        if delta < 0 {
            sells.push(OrderIntent {
                symbol: symbol.clone(),
                side: Side::Sell,
                qty: -delta,
            });
        } else {
            buys.push(OrderIntent {
                symbol: symbol.clone(),
                side: Side::Buy,
                qty: delta,
            });
        }
    }

    sells.sort_by_key(|intent| (!defensive_symbols.contains(&intent.symbol.as_str()), intent.symbol.clone()));
    buys.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    Ok(sells.into_iter().chain(buys).collect())
}
