//! VaR engine
//!
//! `VarEngine` runs every estimator over one portfolio and collects the
//! results into a `VarReport`. It carries the configuration (simulation
//! count, seed, numerical knobs) and an optional cancellation handle.

use crate::config::VarConfig;
use crate::control::Cancellation;
use crate::error::Result;
use crate::estimators::historical::historical_var;
use crate::estimators::monte_carlo::{monte_carlo_var, seeded_rng, SimulationRequest};
use crate::estimators::parametric::parametric_var;
use crate::estimators::{
    compute_expected_shortfall, EstimatorOptions, ExpectedShortfallResult, MonteCarloVarResult,
    VarResult,
};
use crate::portfolio::{
    pair_correlation, portfolio_returns, AssetReturns, CovarianceEstimate, PortfolioReturnSeries,
    PortfolioWeights,
};
use crate::returns::ReturnSeries;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Asset names used by [`VarEngine::dual_asset_var`]
pub const DUAL_ASSET_NAMES: [&str; 2] = ["asset_a", "asset_b"];

/// Results of every VaR method for one portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarReport {
    pub confidence_level: f64,
    pub horizon: u32,
    pub notional: f64,
    pub historical: VarResult,
    pub parametric: VarResult,
    pub monte_carlo: MonteCarloVarResult,
    pub expected_shortfall: ExpectedShortfallResult,

    /// Pearson correlation of the two assets (two-asset runs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<f64>,
}

/// VaR engine
#[derive(Debug, Clone, Default)]
pub struct VarEngine {
    config: VarConfig,
    cancellation: Option<Cancellation>,
}

impl VarEngine {
    pub fn new(config: VarConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Engine with configuration parsed from YAML
    ///
    /// # Example
    ///
    /// ```
    /// use vaultvar_risk::VarEngine;
    ///
    /// let engine = VarEngine::from_yaml("default_simulations: 2000\nrandom_seed: 1").unwrap();
    /// assert_eq!(engine.config().default_simulations, 2_000);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(VarConfig::from_yaml(yaml)?))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(VarConfig::from_json(json)?))
    }

    /// Attach a cancellation handle checked before and during simulation
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn config(&self) -> &VarConfig {
        &self.config
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    fn options(&self) -> EstimatorOptions {
        EstimatorOptions::from(&self.config)
    }

    /// Weighted portfolio series using the configured weight tolerance
    pub fn portfolio_returns(
        &self,
        returns: &AssetReturns,
        weights: &PortfolioWeights,
    ) -> Result<PortfolioReturnSeries> {
        portfolio_returns(returns, weights, self.config.weight_tolerance)
    }

    /// Historical, parametric and Monte Carlo VaR plus Expected Shortfall
    pub fn compute_all(
        &self,
        returns: &AssetReturns,
        weights: &PortfolioWeights,
        confidence_level: f64,
        horizon: u32,
        notional: f64,
    ) -> Result<VarReport> {
        let options = self.options();
        let span = tracing::debug_span!(
            "compute_all",
            assets = returns.asset_count(),
            observations = returns.observations(),
            confidence_level,
            horizon
        );
        let _guard = span.enter();

        // Weights are validated here, before any numerical work
        let series = self.portfolio_returns(returns, weights)?;

        let historical = historical_var(&series, confidence_level, horizon, notional, &options)?;
        let parametric =
            parametric_var(returns, weights, confidence_level, horizon, notional, &options)?;
        let expected_shortfall = compute_expected_shortfall(&series, confidence_level, notional)?;

        if let Some(token) = &self.cancellation {
            token.check("Monte Carlo VaR")?;
        }
        let request = SimulationRequest {
            confidence_level,
            horizon,
            notional,
            num_simulations: self.config.default_simulations,
        };
        let mut rng = seeded_rng(self.config.random_seed);
        let monte_carlo = monte_carlo_var(
            returns,
            weights,
            &request,
            &options,
            self.cancellation.as_ref(),
            &mut rng,
        )?;

        tracing::debug!(
            historical = historical.var_return,
            parametric = parametric.var_return,
            monte_carlo = monte_carlo.var.var_return,
            expected_shortfall = expected_shortfall.es_return,
            "VaR report complete"
        );

        Ok(VarReport {
            confidence_level,
            horizon,
            notional,
            historical,
            parametric,
            monte_carlo,
            expected_shortfall,
            correlation: None,
        })
    }

    /// Report for a two-asset portfolio, with the assets' correlation
    pub fn dual_asset_var(
        &self,
        asset_a: ReturnSeries,
        asset_b: ReturnSeries,
        weights: [f64; 2],
        confidence_level: f64,
        horizon: u32,
        notional: f64,
    ) -> Result<VarReport> {
        let [name_a, name_b] = DUAL_ASSET_NAMES;
        let returns = AssetReturns::new(vec![(name_a, asset_a), (name_b, asset_b)])?;
        let weights = PortfolioWeights::from_pairs([(name_a, weights[0]), (name_b, weights[1])]);

        let mut report = self.compute_all(&returns, &weights, confidence_level, horizon, notional)?;
        report.correlation = Some(pair_correlation(&returns, name_a, name_b)?);
        Ok(report)
    }

    /// Pairwise correlation of all assets, in column order
    pub fn correlation_matrix(&self, returns: &AssetReturns) -> DMatrix<f64> {
        CovarianceEstimate::from_returns(returns).correlation_matrix()
    }

    /// [`compute_all`](Self::compute_all) on tokio's blocking pool
    ///
    /// Wrap the future in `tokio::time::timeout` and trip the engine's
    /// cancellation handle on expiry to stop the simulation early.
    #[cfg(feature = "async")]
    pub async fn compute_all_async(
        &self,
        returns: AssetReturns,
        weights: PortfolioWeights,
        confidence_level: f64,
        horizon: u32,
        notional: f64,
    ) -> Result<VarReport> {
        let engine = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            engine.compute_all(&returns, &weights, confidence_level, horizon, notional)
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(crate::error::VarError::Cancelled(
                "VaR task was cancelled".to_string(),
            )),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

/// Every method with default configuration
pub fn compute_all_methods(
    returns: &AssetReturns,
    weights: &PortfolioWeights,
    confidence_level: f64,
    horizon: u32,
    notional: f64,
) -> Result<VarReport> {
    VarEngine::default().compute_all(returns, weights, confidence_level, horizon, notional)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VarError;
    use approx::assert_relative_eq;

    fn create_test_assets() -> AssetReturns {
        let a: Vec<f64> = (0..60).map(|i| ((i * 7 % 13) as f64 - 6.0) / 400.0).collect();
        let b: Vec<f64> = (0..60).map(|i| ((i * 5 % 11) as f64 - 5.0) / 300.0).collect();
        AssetReturns::new(vec![("A", ReturnSeries::new(a)), ("B", ReturnSeries::new(b))]).unwrap()
    }

    fn seeded_engine() -> VarEngine {
        VarEngine::new(VarConfig {
            default_simulations: 5_000,
            random_seed: Some(11),
            ..Default::default()
        })
    }

    #[test]
    fn test_compute_all() {
        let assets = create_test_assets();
        let weights = PortfolioWeights::from_pairs([("A", 0.4), ("B", 0.6)]);
        let report = seeded_engine()
            .compute_all(&assets, &weights, 0.95, 1, 1_000_000.0)
            .unwrap();

        assert_eq!(report.historical.observations, 60);
        assert!(report.historical.var_return < 0.0);
        assert!(report.parametric.var_return < 0.0);
        assert!(report.monte_carlo.var.var_return < 0.0);
        assert!(report.expected_shortfall.es_return <= report.historical.var_return);
        assert!(report.correlation.is_none());
        assert!(!report.historical.low_confidence);
    }

    #[test]
    fn test_seeded_engine_is_reproducible() {
        let assets = create_test_assets();
        let weights = PortfolioWeights::equal(["A", "B"]);
        let a = seeded_engine().compute_all(&assets, &weights, 0.99, 5, 1.0).unwrap();
        let b = seeded_engine().compute_all(&assets, &weights, 0.99, 5, 1.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_weights_rejected_first() {
        let assets = create_test_assets();
        let weights = PortfolioWeights::from_pairs([("A", 0.6), ("B", 0.6)]);
        let err = compute_all_methods(&assets, &weights, 0.95, 1, 1.0).unwrap_err();
        assert!(matches!(err, VarError::InvalidParameter(_)));
    }

    #[test]
    fn test_dual_asset_var_reports_correlation() {
        let a = ReturnSeries::new(vec![0.01, -0.02, 0.015, -0.01, 0.02, 0.003]);
        let b = ReturnSeries::new(vec![0.02, -0.04, 0.03, -0.02, 0.04, 0.006]);
        let report = seeded_engine()
            .dual_asset_var(a, b, [0.5, 0.5], 0.95, 1, 10_000.0)
            .unwrap();
        // b = 2a: perfectly correlated
        assert_relative_eq!(report.correlation.unwrap(), 1.0, epsilon = 1e-9);
        assert!(report.historical.low_confidence);
    }

    #[test]
    fn test_cancelled_engine() {
        let token = Cancellation::new();
        token.cancel();
        let engine = seeded_engine().with_cancellation(token);
        let err = engine
            .compute_all(&create_test_assets(), &PortfolioWeights::equal(["A", "B"]), 0.95, 1, 1.0)
            .unwrap_err();
        assert!(matches!(err, VarError::Cancelled(_)));
    }

    #[test]
    fn test_correlation_matrix() {
        let corr = VarEngine::default().correlation_matrix(&create_test_assets());
        assert_eq!(corr.shape(), (2, 2));
        assert_eq!(corr[(0, 0)], 1.0);
        assert_relative_eq!(corr[(0, 1)], corr[(1, 0)]);
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = seeded_engine()
            .compute_all(&create_test_assets(), &PortfolioWeights::equal(["A", "B"]), 0.95, 1, 1.0)
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["monte_carlo"]["method"], "monte_carlo");
        assert!(json.get("correlation").is_none());
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_compute_all_async() {
        let report = seeded_engine()
            .compute_all_async(create_test_assets(), PortfolioWeights::equal(["A", "B"]), 0.95, 1, 1.0)
            .await
            .unwrap();
        assert!(report.parametric.var_return < 0.0);
    }
}
