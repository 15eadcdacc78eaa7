use std::path::Path;

use anyhow::{Context, Result};

use regime_analytics::{analyze, AnalyticsConfig};
use regime_backtest::{BacktestConfig, BacktestEngine};
use regime_config::ResolvedConfig;
use regime_data::{load_csv_file, Timeframe};
use regime_strategy::RegimeStrategy;

#[allow(clippy::too_many_arguments)]
pub fn run(bars_path: String, config_paths: Vec<String>, timeframe_secs: i64, daily_risk_free_rate: f64, out_dir: Option<String>) -> Result<()> {
    if timeframe_secs <= 0 {
        anyhow::bail!("--timeframe-secs must be > 0");
    }

    let loaded = regime_config::load_layered_yaml(&config_paths).context("load config failed")?;
    let resolved: ResolvedConfig = loaded.raw.clone().into();

    let bars = load_csv_file(&bars_path, Timeframe(timeframe_secs)).with_context(|| format!("load bars csv failed: {bars_path}"))?;

    let strategy = RegimeStrategy::new(
        "regime-core",
        timeframe_secs,
        resolved.universe.clone(),
        resolved.regime,
        resolved.allocation,
        resolved.bond_sma_fast,
        resolved.bond_sma_slow,
        resolved.safety_margin,
    );

    let config = BacktestConfig {
        timeframe_secs,
        initial_capital: resolved.initial_capital,
        costs: resolved.costs,
    };

    let mut engine = BacktestEngine::new(config);
    engine.add_strategy(Box::new(strategy)).context("add_strategy failed")?;

    let report = engine.run(&bars, &|| false).context("backtest run failed")?;

    let perf = analyze(&report, &AnalyticsConfig { daily_risk_free_rate });

    if let Some(dir) = out_dir.as_deref() {
        std::fs::create_dir_all(dir).with_context(|| format!("create out_dir failed: {dir}"))?;
        let perf_path = Path::new(dir).join("performance.json");
        std::fs::write(&perf_path, serde_json::to_string_pretty(&perf)?).context("write performance.json failed")?;
        println!("artifacts_written=true out_dir={dir}");
    } else {
        println!("artifacts_written=false");
    }

    println!("backtest_ok=true");
    println!("config_hash={}", loaded.config_hash);
    println!("bars_loaded={}", bars.len());
    println!("fills={}", report.trade_ledger.iter().filter(|e| matches!(e, regime_portfolio::LedgerEntry::Fill(_))).count());
    println!("rejections={}", report.trade_ledger.iter().filter(|e| matches!(e, regime_portfolio::LedgerEntry::Rejected { .. })).count());
    println!("cancelled={}", report.cancelled);
    println!("final_equity_micros={}", report.equity_series.last().map(|(_, eq)| eq.raw()).unwrap_or(resolved.initial_capital.raw()));
    println!("total_return={:.6}", perf.total_return);
    println!("cagr={:.6}", perf.cagr);
    println!("sharpe={:.6}", perf.sharpe);
    println!("sortino={:.6}", perf.sortino);
    println!("max_drawdown={:.6}", perf.max_drawdown);
    println!("calmar={:.6}", perf.calmar);
    println!("var_95={:.6}", perf.var_95);
    println!("cvar_95={:.6}", perf.cvar_95);
    println!("win_rate={:.6}", perf.win_rate);
    println!("profit_factor={:.6}", perf.profit_factor);

    Ok(())
}
