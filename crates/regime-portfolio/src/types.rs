//! Position, fill, and portfolio types.
//!
//! Position accounting is **average-cost**, not FIFO-lot: a position carries
//! a single `average_entry_price` that is cost-weighted merged on buys and
//! left unchanged on sell-reductions. This is a deliberate, narrower model
//! than lot-level FIFO — it matches the accounting contract this crate's
//! positions are required to expose and nothing more.

use std::collections::BTreeMap;
use std::fmt;

use crate::fixedpoint::Micros;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A post-execution fill record.
#[derive(Clone, Debug, PartialEq)]
pub struct Fill {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
    pub fill_price: Micros,
    pub commission: Micros,
    pub slippage: Micros,
    pub timestamp: i64,
    pub order_id: String,
}

impl Fill {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        qty: i64,
        fill_price: Micros,
        commission: Micros,
        slippage: Micros,
        timestamp: i64,
        order_id: impl Into<String>,
    ) -> Self {
        debug_assert!(qty > 0, "Fill.qty must be > 0");
        debug_assert!(fill_price.is_non_negative(), "Fill.fill_price must be >= 0");
        debug_assert!(commission.is_non_negative(), "Fill.commission must be >= 0");
        Self {
            symbol: symbol.into(),
            side,
            qty,
            fill_price,
            commission,
            slippage,
            timestamp,
            order_id: order_id.into(),
        }
    }
}

/// A rejected order: no fill occurred, the ledger is unchanged, the strategy
/// is informed via a documented reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    InsufficientCash,
    InsufficientHolding,
    UnknownSymbol,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::InsufficientCash => write!(f, "insufficient cash"),
            RejectionReason::InsufficientHolding => write!(f, "insufficient holding"),
            RejectionReason::UnknownSymbol => write!(f, "unknown symbol"),
        }
    }
}

/// A single ledger entry: either a fill or a rejection. Rejections are
/// appended so the run's history shows every attempted order, not just the
/// successful ones.
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerEntry {
    Fill(Fill),
    Rejected {
        symbol: String,
        side: Side,
        qty: i64,
        reason: RejectionReason,
        timestamp: i64,
    },
}

/// One symbol's open position, average-cost accounted.
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub symbol: String,
    /// Signed: positive = long, negative = short.
    pub quantity: i64,
    pub average_entry_price: Micros,
    pub current_price: Micros,
}

impl Position {
    pub fn market_value(&self) -> Micros {
        self.current_price.mul_qty_signed(self.quantity)
    }

    pub fn unrealized_pnl(&self) -> Micros {
        let delta = self.current_price - self.average_entry_price;
        delta.mul_qty_signed(self.quantity)
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }
}

impl Micros {
    /// Multiply by a signed share quantity using an `i128` intermediate —
    /// positions can be short, so the plain `checked_mul_qty` (which exists
    /// for always-positive fill quantities) isn't reused here.
    pub fn mul_qty_signed(self, qty: i64) -> Micros {
        let product = self.raw() as i128 * qty as i128;
        Micros::new(crate::fixedpoint::i128_to_i64_clamp(product))
    }
}

/// A cash-ledger entry: a commission/slippage debit, or a fill's cash delta.
#[derive(Clone, Debug, PartialEq)]
pub struct CashEntry {
    pub delta: Micros,
    pub timestamp: i64,
    pub reason: String,
}

/// The full portfolio: cash plus all open positions, keyed by symbol for
/// deterministic iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioState {
    pub cash: Micros,
    pub positions: BTreeMap<String, Position>,
    pub initial_capital: Micros,
}

impl PortfolioState {
    pub fn new(initial_capital: Micros) -> Self {
        Self {
            cash: initial_capital,
            positions: BTreeMap::new(),
            initial_capital,
        }
    }

    pub fn positions_value(&self) -> Micros {
        self.positions
            .values()
            .fold(Micros::ZERO, |acc, p| acc.saturating_add(p.market_value()))
    }

    pub fn total_equity(&self) -> Micros {
        self.cash.saturating_add(self.positions_value())
    }

    pub fn mark_to_market(&mut self, closes: &BTreeMap<String, Micros>) {
        for (symbol, position) in self.positions.iter_mut() {
            if let Some(&px) = closes.get(symbol) {
                position.current_price = px;
            }
        }
    }
}
