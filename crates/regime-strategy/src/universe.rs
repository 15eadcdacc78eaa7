//! The fixed five-instrument universe a regime strategy trades, plus the
//! two bond-proxy symbols used only to derive the safe-haven trend signal
//! (never traded directly).

use regime_portfolio::Slot;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Universe {
    pub primary_equity: String,
    pub leveraged_equity: String,
    pub long_duration_defensive: String,
    pub inverse_duration_defensive: String,
    pub cash_symbol: String,
    /// Symbol whose closes drive `bond_sma_fast`/`bond_sma_slow` — may or
    /// may not coincide with `long_duration_defensive`.
    pub bond_trend_proxy: String,
}

impl Universe {
    pub fn symbol_for(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::PrimaryEquity => Some(&self.primary_equity),
            Slot::LeveragedEquity => Some(&self.leveraged_equity),
            Slot::LongDurationDefensive => Some(&self.long_duration_defensive),
            Slot::InverseDurationDefensive => Some(&self.inverse_duration_defensive),
            Slot::Cash => None,
        }
    }

    /// Symbols rebalanced to zero/target on a cash-only cell (everything
    /// except the cash sleeve, which has no tradable instrument).
    pub fn tradable_symbols(&self) -> Vec<&str> {
        vec![
            &self.primary_equity,
            &self.leveraged_equity,
            &self.long_duration_defensive,
            &self.inverse_duration_defensive,
        ]
    }

    pub fn defensive_symbols(&self) -> Vec<&str> {
        vec![&self.long_duration_defensive, &self.inverse_duration_defensive]
    }
}
