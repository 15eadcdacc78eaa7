//! The backtest event loop.
//!
//! Per-bar algorithm (exact, pinned order):
//! 1. Deliver the bar to the strategy's history (inside `on_bar`, once
//!    warmup is satisfied).
//! 2. Mark `warmup_complete` once `bars_processed >= warmup_requirement`.
//! 3. If warmup is complete, invoke the strategy and execute any signals
//!    at this bar's close (sells before buys).
//! 4. Snapshot portfolio state — **before** this bar's close is marked to
//!    every untouched position (the pinned resolution of the snapshot-
//!    ordering question: the snapshot reflects the pre-mark state of the
//!    bar just processed).
//! 5. Mark all positions to market using this bar's close.
//! 6. Increment `bars_processed`.
//!
//! Cancellation is polled once per distinct timestamp, at the top of the
//! loop only — a cancelled run stops cleanly between bars, with no partial
//! bar ever applied and no rollback needed.

use std::collections::BTreeMap;

use regime_data::Bar;
use regime_portfolio::signals::{resolve_signal, Signal, SignalKind};
use regime_portfolio::{accounting, apply_fills_canonical, Ledger, LedgerEntry, Micros, Side, TaggedFill};
use regime_strategy::{BarView, Strategy, StrategyContext, StrategyHost, StrategyIntents};

use crate::types::{BacktestConfig, BacktestError, BacktestReport, RegimeSnapshot};

pub struct BacktestEngine {
    config: BacktestConfig,
    host: StrategyHost,
    ledger: Ledger,
    bars_processed: usize,
    /// Monotonic across the whole run, not just a single bar's fills — the
    /// sequence `ordering::sort_fills_canonical` sorts by.
    next_seq: u64,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        let shadow = regime_strategy::ShadowMode::Off;
        Self {
            ledger: Ledger::new(config.initial_capital),
            config,
            host: StrategyHost::new(shadow),
            bars_processed: 0,
            next_seq: 0,
        }
    }

    pub fn add_strategy(&mut self, s: Box<dyn Strategy>) -> Result<(), BacktestError> {
        self.host.register(s).map_err(BacktestError::StrategyHost)
    }

    /// Run the backtest over a sequence of bars (any number of symbols,
    /// already sorted ascending by `(end_ts, symbol)`).
    pub fn run(&mut self, bars: &[Bar], cancel: &dyn Fn() -> bool) -> Result<BacktestReport, BacktestError> {
        let warmup_requirement = self.host.warmup_requirement().map_err(BacktestError::StrategyHost)?;

        let mut equity_series = Vec::new();
        let mut regime_series = Vec::new();
        let mut last_ts: Option<i64> = None;
        let mut cancelled = false;

        for group in group_by_timestamp(bars) {
            if cancel() {
                cancelled = true;
                break;
            }

            let ts = group[0].end_ts;
            if ts < 0 {
                return Err(BacktestError::NegativeTimestamp { end_ts: ts });
            }
            for bar in &group {
                if !bar.is_complete {
                    return Err(BacktestError::IncompleteBar {
                        symbol: bar.symbol.clone(),
                        end_ts: bar.end_ts,
                    });
                }
            }

            let closes: BTreeMap<String, Micros> = group
                .iter()
                .map(|b| (b.symbol.clone(), Micros::new(b.close_micros)))
                .collect();

            let warmup_complete = self.bars_processed >= warmup_requirement;

            if warmup_complete {
                let ctx_bars: BTreeMap<String, BarView> = group
                    .iter()
                    .map(|b| {
                        (
                            b.symbol.clone(),
                            BarView {
                                symbol: b.symbol.clone(),
                                end_ts: b.end_ts,
                                close: b.close_micros as f64 / regime_portfolio::MICROS_SCALE as f64,
                            },
                        )
                    })
                    .collect();
                let ctx = StrategyContext {
                    timeframe_secs: self.config.timeframe_secs,
                    end_ts: ts,
                    bars: ctx_bars,
                    bars_processed: self.bars_processed,
                };

                let intents: StrategyIntents = self.host.on_bar(&ctx).map_err(BacktestError::StrategyHost)?;

                if intents.should_execute() {
                    self.execute_signals(&intents.output.signals, &closes, ts)?;
                }
            }

            // 4. Snapshot before marking this bar's close to every position.
            let snap = self.ledger.snapshot(ts);
            let (cell, target_weights) = if warmup_complete {
                let state = self.host.current_state().map_err(BacktestError::StrategyHost)?;
                (state.cell, state.target_weights)
            } else {
                (None, regime_portfolio::Weights::zero())
            };
            regime_series.push(RegimeSnapshot {
                timestamp: ts,
                equity: snap.equity,
                cash: snap.cash,
                positions_value: snap.positions_value,
                cell,
                target_weights,
            });

            // 5. Mark all positions to market using this bar's close.
            self.ledger.mark_to_market(&closes);

            // 6. Increment bars_processed.
            self.bars_processed += 1;

            equity_series.push((ts, self.ledger.equity_micros()));
            last_ts = Some(ts);
        }

        if cancelled {
            return Err(BacktestError::Cancelled {
                last_processed_ts: last_ts.unwrap_or(0),
            });
        }

        Ok(BacktestReport {
            equity_series,
            trade_ledger: self.ledger.entries.clone(),
            regime_series,
            final_positions: self.ledger.portfolio.positions.values().cloned().collect(),
            cancelled: false,
        })
    }

    /// Resolves signals to order intents (sells before buys) and executes
    /// them against the portfolio. Every fill is tagged with a run-wide
    /// monotonic `seq_no` and routed through `apply_fills_canonical`, so
    /// the ledger's append order is pinned independent of how this
    /// function happened to walk the signal list.
    fn execute_signals(&mut self, signals: &[Signal], closes: &BTreeMap<String, Micros>, ts: i64) -> Result<(), BacktestError> {
        let total_equity = self.ledger.equity_micros();
        let mut sells = Vec::new();
        let mut buys = Vec::new();

        for signal in signals {
            let Some(&close) = closes.get(&signal.symbol) else { continue };
            let fill_price = match signal.kind {
                SignalKind::Buy | SignalKind::BuyPercent | SignalKind::RebalanceToWeight => {
                    self.config.costs.buy_fill_price(close)
                }
                SignalKind::Sell | SignalKind::SellPercent => self.config.costs.sell_fill_price(close),
            };
            if let Some(intent) = resolve_signal(signal, fill_price, total_equity, &self.ledger.portfolio) {
                match intent.side {
                    Side::Sell => sells.push((intent.symbol, intent.qty, close)),
                    Side::Buy => buys.push((intent.symbol, intent.qty, close)),
                }
            }
        }

        let mut tagged_fills = Vec::new();
        for (symbol, qty, close) in sells {
            self.next_seq += 1;
            let seq_no = self.next_seq;
            let order_id = format!("o{seq_no}");
            let entry = accounting::apply_sell(&mut self.ledger.portfolio, &symbol, qty, close, &self.config.costs, ts, &order_id);
            self.record(entry, seq_no, &mut tagged_fills);
        }
        for (symbol, qty, close) in buys {
            self.next_seq += 1;
            let seq_no = self.next_seq;
            let order_id = format!("o{seq_no}");
            let entry = accounting::apply_buy(&mut self.ledger.portfolio, &symbol, qty, close, &self.config.costs, ts, &order_id);
            self.record(entry, seq_no, &mut tagged_fills);
        }

        apply_fills_canonical(&mut self.ledger, &mut tagged_fills).map_err(BacktestError::Ledger)
    }

    fn record(&mut self, entry: LedgerEntry, seq_no: u64, tagged_fills: &mut Vec<TaggedFill>) {
        match entry {
            LedgerEntry::Fill(fill) => tagged_fills.push(TaggedFill { seq_no, fill }),
            rejected @ LedgerEntry::Rejected { .. } => self.ledger.append_rejection(rejected),
        }
    }
}

fn group_by_timestamp(bars: &[Bar]) -> Vec<Vec<Bar>> {
    let mut groups: Vec<Vec<Bar>> = Vec::new();
    for bar in bars {
        match groups.last_mut() {
            Some(last) if last[0].end_ts == bar.end_ts => last.push(bar.clone()),
            _ => groups.push(vec![bar.clone()]),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use regime_classifier::{Cell, RegimeConfig};
    use regime_portfolio::{allocator::AllocationConfig, CommissionModel};
    use regime_strategy::{RegimeStrategy, Universe};

    fn flat_bars(symbol: &str, n: i64, price_micros: i64) -> Vec<Bar> {
        (1..=n)
            .map(|ts| {
                Bar::new(symbol, regime_data::Timeframe::DAILY, ts, price_micros, price_micros, price_micros, price_micros, 1_000, true).unwrap()
            })
            .collect()
    }

    fn regime_cfg() -> RegimeConfig {
        RegimeConfig {
            sma_fast: 10,
            sma_slow: 30,
            t_norm_bull_thresh: 0.05,
            t_norm_bear_thresh: -0.05,
            t_max: 1.0,
            realized_vol_window: 10,
            vol_baseline_window: 20,
            upper_thresh_z: 1.5,
            lower_thresh_z: -0.5,
            vol_crush_threshold: -0.15,
            vol_crush_lookback: 5,
            cell1_exit_confirmation_enabled: false,
            cell1_exit_confirmation_days: 2,
            kalman: regime_indicators::KalmanConfig::default(),
        }
    }

    #[test]
    fn flat_market_ends_in_cell3_with_one_rebalance_cost() {
        let universe = Universe {
            primary_equity: "SPY".into(),
            leveraged_equity: "UPRO".into(),
            long_duration_defensive: "TLT".into(),
            inverse_duration_defensive: "TBF".into(),
            cash_symbol: "CASH".into(),
            bond_trend_proxy: "TLT".into(),
        };
        let alloc_cfg = AllocationConfig {
            leverage_scalar: 1.0,
            rebalance_threshold: 0.025,
            max_bond_weight: 0.40,
        };
        let strategy = RegimeStrategy::new("regime-core", 86_400, universe, regime_cfg(), alloc_cfg, 5, 20, 0);

        let mut spy = flat_bars("SPY", 100, 100_000_000);
        let mut tlt = flat_bars("TLT", 100, 50_000_000);
        let mut upro = flat_bars("UPRO", 100, 100_000_000);
        let mut tbf = flat_bars("TBF", 100, 50_000_000);
        let mut bars = Vec::new();
        bars.append(&mut spy);
        bars.append(&mut tlt);
        bars.append(&mut upro);
        bars.append(&mut tbf);
        bars.sort_by(|a, b| a.end_ts.cmp(&b.end_ts).then(a.symbol.cmp(&b.symbol)));

        let config = BacktestConfig {
            timeframe_secs: 86_400,
            initial_capital: Micros::new(1_000_000_000_000),
            costs: CommissionModel {
                commission_per_share: Micros::ZERO,
                slippage_bps: 0,
            },
        };
        let mut engine = BacktestEngine::new(config);
        engine.add_strategy(Box::new(strategy)).unwrap();
        let report = engine.run(&bars, &|| false).unwrap();

        let last_cell = report.regime_series.last().and_then(|s| s.cell);
        assert_eq!(last_cell, Some(Cell::Cell3));
        assert!(report.trade_ledger.iter().any(|e| matches!(e, LedgerEntry::Fill(_))));
    }

    #[test]
    fn cancellation_stops_between_bars_with_no_partial_state() {
        let universe = Universe {
            primary_equity: "SPY".into(),
            leveraged_equity: "UPRO".into(),
            long_duration_defensive: "TLT".into(),
            inverse_duration_defensive: "TBF".into(),
            cash_symbol: "CASH".into(),
            bond_trend_proxy: "TLT".into(),
        };
        let alloc_cfg = AllocationConfig {
            leverage_scalar: 1.0,
            rebalance_threshold: 0.025,
            max_bond_weight: 0.40,
        };
        let strategy = RegimeStrategy::new("regime-core", 86_400, universe, regime_cfg(), alloc_cfg, 5, 20, 0);
        let bars = flat_bars("SPY", 10, 100_000_000);

        let config = BacktestConfig {
            timeframe_secs: 86_400,
            initial_capital: Micros::new(1_000_000_000_000),
            costs: CommissionModel {
                commission_per_share: Micros::ZERO,
                slippage_bps: 0,
            },
        };
        let mut engine = BacktestEngine::new(config);
        engine.add_strategy(Box::new(strategy)).unwrap();
        let result = engine.run(&bars, &|| true);
        assert!(matches!(result, Err(BacktestError::Cancelled { .. })));
    }
}
