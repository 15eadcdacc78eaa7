//! Canonical fill ordering.
//!
//! Fills carry a `seq_no` assigned at generation time; applying them to the
//! ledger out of that order (or in whatever order a `HashMap`/scheduler
//! happened to produce) would make replay non-deterministic. Sorting by
//! `(seq_no, symbol, side_ord, qty)` before application pins one canonical
//! order regardless of how the fills were produced.

use crate::ledger::{Ledger, LedgerError};
use crate::types::{Fill, Side};

#[derive(Clone, Debug, PartialEq)]
pub struct TaggedFill {
    pub seq_no: u64,
    pub fill: Fill,
}

fn side_ord(side: Side) -> u8 {
    match side {
        Side::Buy => 0,
        Side::Sell => 1,
    }
}

/// Sort fills into the canonical `(seq_no, symbol, side_ord, qty)` order.
pub fn sort_fills_canonical(fills: &mut [TaggedFill]) {
    fills.sort_by(|a, b| {
        a.seq_no
            .cmp(&b.seq_no)
            .then_with(|| a.fill.symbol.cmp(&b.fill.symbol))
            .then_with(|| side_ord(a.fill.side).cmp(&side_ord(b.fill.side)))
            .then_with(|| a.fill.qty.cmp(&b.fill.qty))
    });
}

/// Sort then apply a batch of already-executed fills to the ledger in
/// canonical order.
pub fn apply_fills_canonical(ledger: &mut Ledger, fills: &mut [TaggedFill]) -> Result<(), LedgerError> {
    sort_fills_canonical(fills);
    for tagged in fills.iter() {
        ledger.append_fill_seq(tagged.seq_no, tagged.fill.clone())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixedpoint::Micros;

    fn fill(symbol: &str, side: Side, qty: i64) -> Fill {
        Fill::new(symbol, side, qty, Micros::new(100_000_000), Micros::ZERO, Micros::ZERO, 1, "o")
    }

    #[test]
    fn sorts_by_seq_then_symbol_then_side_then_qty() {
        let mut fills = vec![
            TaggedFill { seq_no: 2, fill: fill("MSFT", Side::Buy, 1) },
            TaggedFill { seq_no: 1, fill: fill("AAPL", Side::Sell, 5) },
            TaggedFill { seq_no: 1, fill: fill("AAPL", Side::Buy, 5) },
        ];
        sort_fills_canonical(&mut fills);
        assert_eq!(fills[0].fill.side, Side::Buy);
        assert_eq!(fills[1].fill.side, Side::Sell);
        assert_eq!(fills[2].seq_no, 2);
    }
}
