use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use vaultvar_risk::{fetch_aligned, Cancellation, CsvPriceProvider, PerformanceSummary, VarEngine};

mod config;
mod report;

use config::Config;
use report::RunOutput;

#[derive(Parser, Debug)]
#[clap(name = "vaultvar", about = "Value-at-Risk report for a portfolio of priced assets")]
struct Args {
    #[clap(short, long, default_value = "vaultvar.yaml")]
    config: PathBuf,

    /// Override portfolio.confidence (e.g. 0.99)
    #[clap(long)]
    confidence: Option<f64>,

    /// Override portfolio.horizon, in periods
    #[clap(long)]
    horizon: Option<u32>,

    /// Override portfolio.notional
    #[clap(long)]
    notional: Option<f64>,

    /// Override risk.random_seed for a reproducible Monte Carlo run
    #[clap(long)]
    seed: Option<u64>,

    /// Abort the computation after this many seconds
    #[clap(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Loading configuration from {:?}", args.config);
    let mut config = Config::load(&args.config)?;
    if let Some(confidence) = args.confidence {
        config.portfolio.confidence = confidence;
    }
    if let Some(horizon) = args.horizon {
        config.portfolio.horizon = horizon;
    }
    if let Some(notional) = args.notional {
        config.portfolio.notional = notional;
    }
    if args.seed.is_some() {
        config.risk.random_seed = args.seed;
    }

    // Load and align prices
    info!("Loading prices from {:?}", config.data.prices_csv);
    let provider = CsvPriceProvider::from_path(&config.data.prices_csv)
        .with_context(|| format!("Failed to load {}", config.data.prices_csv.display()))?;
    let tickers = config.tickers();
    let table = fetch_aligned(&provider, &tickers, &config.history_request())?;
    info!("Aligned {} periods for {} tickers", table.len(), tickers.len());

    let returns = table.to_asset_returns()?;

    let cancellation = Cancellation::new();
    let engine = VarEngine::new(config.risk.clone()).with_cancellation(cancellation.clone());

    let series = engine.portfolio_returns(&returns, &config.portfolio.weights)?;
    let performance = PerformanceSummary::from_returns(&series, config.portfolio.risk_free_rate)?;

    let portfolio = &config.portfolio;
    let computation = engine.compute_all_async(
        returns,
        portfolio.weights.clone(),
        portfolio.confidence,
        portfolio.horizon,
        portfolio.notional,
    );
    let report = match tokio::time::timeout(Duration::from_secs(args.timeout_secs), computation).await {
        Ok(result) => result?,
        Err(_) => {
            cancellation.cancel();
            bail!("VaR computation timed out after {}s", args.timeout_secs);
        }
    };

    let output = RunOutput {
        tickers,
        periods: table.len(),
        start: table.timestamps.first().copied(),
        end: table.timestamps.last().copied(),
        report,
        performance,
    };
    output.log_summary();
    println!("{}", output.to_json()?);

    Ok(())
}
