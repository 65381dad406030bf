//! # VaR Estimators
//!
//! - `historical`: empirical quantile of realized portfolio returns
//! - `parametric`: variance-covariance VaR under joint normality
//! - `monte_carlo`: quantile of correlated normal scenarios
//! - `shortfall`: Expected Shortfall (average return beyond the VaR cutoff)
//!
//! All results use the signed-return convention: VaR is the `(1 - c)`
//! quantile of the return distribution, so a more negative number means a
//! larger loss. Dollar figures are `var_return * notional`.

pub mod historical;
pub mod monte_carlo;
pub mod parametric;
pub mod shortfall;

pub use historical::compute_historical_var;
pub use monte_carlo::{compute_monte_carlo_var, monte_carlo_var_seeded, MonteCarloVarResult};
pub use parametric::compute_parametric_var;
pub use shortfall::{compute_expected_shortfall, ExpectedShortfallResult};

use crate::config::VarConfig;
use crate::error::{Result, VarError};
use crate::horizon::validate_horizon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// VaR calculation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    Historical,
    Parametric,
    MonteCarlo,
}

impl fmt::Display for VarMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VarMethod::Historical => "historical",
            VarMethod::Parametric => "parametric",
            VarMethod::MonteCarlo => "monte_carlo",
        };
        f.write_str(name)
    }
}

/// VaR calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarResult {
    /// Calculation method used
    pub method: VarMethod,

    /// Confidence level (e.g., 0.95, 0.99)
    pub confidence_level: f64,

    /// Time horizon in periods
    pub horizon: u32,

    /// Horizon-scaled return quantile (negative = loss)
    pub var_return: f64,

    /// `var_return * notional`
    pub var_amount: f64,

    /// Portfolio notional used for `var_amount`
    pub notional: f64,

    /// Number of observations the estimate was fitted on
    pub observations: usize,

    /// Sample too small for a statistically reliable figure
    pub low_confidence: bool,
}

/// Knobs shared by the estimators, normally derived from `VarConfig`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorOptions {
    pub low_sample_threshold: usize,
    pub weight_tolerance: f64,
    pub regularization: f64,
    pub sample_size: usize,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        EstimatorOptions::from(&VarConfig::default())
    }
}

impl From<&VarConfig> for EstimatorOptions {
    fn from(config: &VarConfig) -> Self {
        Self {
            low_sample_threshold: config.low_sample_threshold,
            weight_tolerance: config.weight_tolerance,
            regularization: config.regularization,
            sample_size: config.sample_size,
        }
    }
}

/// Validate the `(confidence, horizon, notional)` triple common to every method
pub(crate) fn validate_inputs(confidence_level: f64, horizon: u32, notional: f64) -> Result<()> {
    validate_confidence(confidence_level)?;
    validate_horizon(horizon)?;
    validate_notional(notional)
}

pub(crate) fn validate_confidence(confidence_level: f64) -> Result<()> {
    // NaN fails both comparisons, so test for the valid range explicitly
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(VarError::InvalidConfidenceLevel(confidence_level));
    }
    Ok(())
}

pub(crate) fn validate_notional(notional: f64) -> Result<()> {
    if !notional.is_finite() || notional <= 0.0 {
        return Err(VarError::InvalidParameter(format!(
            "Notional must be a positive number, got {}",
            notional
        )));
    }
    Ok(())
}

/// Check a return sample has at least two finite values
pub(crate) fn validate_sample(returns: &[f64]) -> Result<()> {
    if returns.len() < 2 {
        return Err(VarError::InsufficientData(format!(
            "Need at least 2 observations, got {}",
            returns.len()
        )));
    }
    if let Some(bad) = returns.iter().find(|r| !r.is_finite()) {
        return Err(VarError::InvalidParameter(format!(
            "Return series contains a non-finite value ({})",
            bad
        )));
    }
    Ok(())
}

pub(crate) fn is_low_sample(observations: usize, options: &EstimatorOptions) -> bool {
    let low = observations < options.low_sample_threshold;
    if low {
        tracing::warn!(
            observations,
            threshold = options.low_sample_threshold,
            "few observations, VaR estimate is statistically unreliable"
        );
    }
    low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_bounds() {
        assert!(validate_confidence(0.95).is_ok());
        for bad in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                validate_confidence(bad),
                Err(VarError::InvalidConfidenceLevel(_))
            ));
        }
    }

    #[test]
    fn test_notional_must_be_positive() {
        assert!(validate_notional(100_000.0).is_ok());
        assert!(validate_notional(0.0).is_err());
        assert!(validate_notional(f64::INFINITY).is_err());
    }

    #[test]
    fn test_method_names() {
        assert_eq!(VarMethod::MonteCarlo.to_string(), "monte_carlo");
        assert_eq!(
            serde_json::to_string(&VarMethod::Historical).unwrap(),
            "\"historical\""
        );
    }
}
