use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use vaultvar_risk::{Interval, PortfolioWeights, PriceHistoryRequest, VarConfig};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub risk: VarConfig,
    pub portfolio: PortfolioConfig,
    pub data: DataConfig,
}

#[derive(Debug, Deserialize)]
pub struct PortfolioConfig {
    /// Ticker -> weight, summing to 1
    pub weights: PortfolioWeights,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_horizon")]
    pub horizon: u32,
    pub notional: f64,
    /// Annual rate used for the Sharpe ratio
    #[serde(default)]
    pub risk_free_rate: f64,
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    /// Wide CSV: date column then one price column per ticker
    pub prices_csv: PathBuf,
    pub lookback: Option<usize>,
    #[serde(default)]
    pub interval: Interval,
}

fn default_confidence() -> f64 {
    0.95
}

fn default_horizon() -> u32 {
    1
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        // Data paths are relative to the config file
        if config.data.prices_csv.is_relative() {
            if let Some(dir) = path.parent() {
                config.data.prices_csv = dir.join(&config.data.prices_csv);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.risk.validate()?;
        ensure!(!self.portfolio.weights.is_empty(), "portfolio.weights is empty");
        ensure!(
            self.data.lookback != Some(0),
            "data.lookback must be at least 1 when set"
        );
        Ok(())
    }

    pub fn tickers(&self) -> Vec<String> {
        self.portfolio
            .weights
            .iter()
            .map(|(ticker, _)| ticker.to_string())
            .collect()
    }

    pub fn history_request(&self) -> PriceHistoryRequest {
        PriceHistoryRequest {
            lookback: self.data.lookback,
            interval: self.data.interval,
        }
    }
}
