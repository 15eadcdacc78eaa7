use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "regime")]
#[command(about = "Regime-based allocation backtest engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run a deterministic backtest over a CSV bar file
    RunBacktest {
        /// Path to a CSV file of OHLCV bars across all universe symbols
        #[arg(long = "bars")]
        bars_path: String,

        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Bar width in seconds (e.g. 86400 for daily)
        #[arg(long = "timeframe-secs", default_value_t = 86_400)]
        timeframe_secs: i64,

        /// Daily risk-free rate used as the Sharpe/Sortino baseline
        #[arg(long = "daily-risk-free-rate", default_value_t = 0.0)]
        daily_risk_free_rate: f64,

        /// Optional directory to write a performance.json artifact into
        #[arg(long = "out-dir")]
        out_dir: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = regime_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
        Commands::RunBacktest { bars_path, config_paths, timeframe_secs, daily_risk_free_rate, out_dir } => {
            commands::run_backtest::run(bars_path, config_paths, timeframe_secs, daily_risk_free_rate, out_dir)?;
        }
    }

    Ok(())
}
