//! # vaultvar-risk: Value-at-Risk Engine
//!
//! Estimates how much a portfolio could lose over a horizon at a given
//! confidence level, using three methods over the same inputs:
//!
//! - **Historical simulation**: empirical quantile of realized returns
//! - **Parametric**: variance-covariance under joint normality
//! - **Monte Carlo**: correlated normal scenarios via Cholesky factorization
//!
//! plus Expected Shortfall, a performance summary, and loaders for price
//! histories (in-memory, wide CSV) and tabular CSV/JSON data.
//!
//! Returns are signed: VaR is the `(1 - c)` quantile of the return
//! distribution scaled by √horizon, so a loss is a negative number.
//!
//! ## Example Usage
//!
//! ```rust
//! use vaultvar_risk::{build_asset_returns, PortfolioWeights, VarConfig, VarEngine};
//!
//! let returns = build_asset_returns(vec![
//!     ("SPY", vec![100.0, 101.0, 100.5, 102.0, 101.0, 103.0, 102.5, 104.0]),
//!     ("TLT", vec![90.0, 89.5, 90.2, 89.8, 90.5, 90.1, 90.9, 90.4]),
//! ])
//! .unwrap();
//! let weights = PortfolioWeights::from_pairs([("SPY", 0.6), ("TLT", 0.4)]);
//!
//! let engine = VarEngine::new(VarConfig {
//!     random_seed: Some(42),
//!     ..Default::default()
//! });
//! let report = engine.compute_all(&returns, &weights, 0.95, 1, 1_000_000.0).unwrap();
//!
//! assert!(report.parametric.var_amount < 0.0);
//! assert!(report.expected_shortfall.es_return <= report.historical.var_return);
//! ```

pub mod config;
pub mod control;
pub mod data;
pub mod engine;
pub mod error;
pub mod estimators;
pub mod horizon;
pub mod metrics;
pub mod portfolio;
pub mod returns;
pub mod stats;

pub use config::VarConfig;
pub use control::Cancellation;
pub use data::{
    align_price_histories, fetch_aligned, CsvPriceProvider, InMemoryPriceProvider, Interval,
    PriceHistoryProvider, PriceHistoryRequest, PricePoint, PriceTable, TabularData,
};
pub use engine::{compute_all_methods, VarEngine, VarReport};
pub use error::{ErrorKind, ProviderError, Result, VarError};
pub use estimators::{
    compute_expected_shortfall, compute_historical_var, compute_monte_carlo_var,
    compute_parametric_var, monte_carlo_var_seeded, ExpectedShortfallResult, MonteCarloVarResult,
    VarMethod, VarResult,
};
pub use horizon::{horizon_scale, scale_to_horizon};
pub use metrics::PerformanceSummary;
pub use portfolio::{
    build_asset_returns, portfolio_returns, AssetReturns, CovarianceEstimate,
    PortfolioReturnSeries, PortfolioWeights,
};
pub use returns::{simple_returns, ReturnSeries};
