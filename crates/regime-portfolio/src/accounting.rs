//! Order execution and average-cost position accounting.
//!
//! BUY: fill price is `close * (1 + slippage)`; required cash is
//! `fill_price * qty + commission * qty`; the whole order is rejected if
//! cash is insufficient — no partial fills. SELL: fill price is
//! `close * (1 - slippage)`; commission is debited from proceeds; quantity
//! is clamped to the held quantity; rejected outright if the holding is
//! zero. A position's average entry price is cost-weighted merged on buys
//! and left unchanged on sell-reductions; the position is removed once its
//! quantity reaches zero.

use crate::fixedpoint::{i128_to_i64_clamp, Micros};
use crate::types::{Fill, LedgerEntry, PortfolioState, Position, RejectionReason, Side};

/// Per-order cost model: a flat per-share commission plus a slippage rate
/// expressed in basis points (1 bps = 0.01%). Integer basis-points math
/// keeps fill prices exact and bit-for-bit reproducible — no float
/// multiply ever touches a monetary amount.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CommissionModel {
    pub commission_per_share: Micros,
    pub slippage_bps: i64,
}

impl CommissionModel {
    pub fn buy_fill_price(&self, close: Micros) -> Micros {
        apply_slippage_bps(close, self.slippage_bps)
    }

    pub fn sell_fill_price(&self, close: Micros) -> Micros {
        apply_slippage_bps(close, -self.slippage_bps)
    }
}

/// Adjust `base` by `bps` basis points using `i128` intermediate arithmetic,
/// mirroring the teacher's `conservative_fill_price` adjustment formula.
/// Positive `bps` moves the price up (worse for a buyer); negative moves it
/// down (worse for a seller).
fn apply_slippage_bps(base: Micros, bps: i64) -> Micros {
    if bps == 0 {
        return base;
    }
    let adjustment = (base.raw() as i128 * bps as i128) / 10_000i128;
    Micros::new(i128_to_i64_clamp(base.raw() as i128 + adjustment))
}

/// Execute a BUY of `qty` shares of `symbol` at `close`, crediting the fill
/// to the ledger and merging it into the position's average cost. Rejects
/// (no state change) if cash is insufficient.
pub fn apply_buy(
    portfolio: &mut PortfolioState,
    symbol: &str,
    qty: i64,
    close: Micros,
    costs: &CommissionModel,
    timestamp: i64,
    order_id: &str,
) -> LedgerEntry {
    debug_assert!(qty > 0, "apply_buy requires a positive quantity");

    let fill_price = costs.buy_fill_price(close);
    let commission = costs.commission_per_share.mul_qty_signed(qty);
    let gross = match fill_price.checked_mul_qty(qty) {
        Some(g) => g,
        None => {
            return LedgerEntry::Rejected {
                symbol: symbol.to_string(),
                side: Side::Buy,
                qty,
                reason: RejectionReason::InsufficientCash,
                timestamp,
            }
        }
    };
    let required_cash = gross.saturating_add(commission);

    if portfolio.cash < required_cash {
        return LedgerEntry::Rejected {
            symbol: symbol.to_string(),
            side: Side::Buy,
            qty,
            reason: RejectionReason::InsufficientCash,
            timestamp,
        };
    }

    portfolio.cash = portfolio.cash.saturating_sub(required_cash);

    portfolio
        .positions
        .entry(symbol.to_string())
        .and_modify(|pos| merge_buy_into_position(pos, qty, fill_price))
        .or_insert_with(|| Position {
            symbol: symbol.to_string(),
            quantity: qty,
            average_entry_price: fill_price,
            current_price: close,
        });

    let fill = Fill::new(
        symbol,
        Side::Buy,
        qty,
        fill_price,
        commission,
        costs.commission_per_share,
        timestamp,
        order_id,
    );
    LedgerEntry::Fill(fill)
}

/// Execute a SELL of up to `qty` shares of `symbol` at `close`. The executed
/// quantity is clamped to the held quantity. Rejects outright if the symbol
/// has no holding.
pub fn apply_sell(
    portfolio: &mut PortfolioState,
    symbol: &str,
    qty: i64,
    close: Micros,
    costs: &CommissionModel,
    timestamp: i64,
    order_id: &str,
) -> LedgerEntry {
    debug_assert!(qty > 0, "apply_sell requires a positive quantity");

    let held = portfolio.positions.get(symbol).map(|p| p.quantity).unwrap_or(0);
    if held <= 0 {
        return LedgerEntry::Rejected {
            symbol: symbol.to_string(),
            side: Side::Sell,
            qty,
            reason: RejectionReason::InsufficientHolding,
            timestamp,
        };
    }

    let executed_qty = qty.min(held);
    let fill_price = costs.sell_fill_price(close);
    let commission = costs.commission_per_share.mul_qty_signed(executed_qty);
    let gross = fill_price
        .checked_mul_qty(executed_qty)
        .unwrap_or(Micros::MAX);
    let proceeds = gross.saturating_sub(commission);

    portfolio.cash = portfolio.cash.saturating_add(proceeds);

    let remaining = held - executed_qty;
    if remaining == 0 {
        portfolio.positions.remove(symbol);
    } else if let Some(pos) = portfolio.positions.get_mut(symbol) {
        pos.quantity = remaining;
        pos.current_price = close;
        // average_entry_price is unchanged on a sell-reduction.
    }

    let fill = Fill::new(
        symbol,
        Side::Sell,
        executed_qty,
        fill_price,
        commission,
        costs.commission_per_share,
        timestamp,
        order_id,
    );
    LedgerEntry::Fill(fill)
}

/// Cost-weighted merge of an additional buy into an existing position.
fn merge_buy_into_position(pos: &mut Position, qty: i64, fill_price: Micros) {
    let existing_cost = pos.average_entry_price.mul_qty_signed(pos.quantity);
    let added_cost = fill_price.mul_qty_signed(qty);
    let new_qty = pos.quantity + qty;
    let total_cost = existing_cost.saturating_add(added_cost);
    pos.average_entry_price = if new_qty != 0 {
        Micros::new(total_cost.raw() / new_qty)
    } else {
        Micros::ZERO
    };
    pos.quantity = new_qty;
}
