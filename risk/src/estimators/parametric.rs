//! Parametric (variance-covariance) VaR
//!
//! Formula: VaR = (μ_p + Z_{1-c} · σ_p) · √h
//! where μ_p = w·μ, σ_p = √(wᵀΣw) and Z is the standard normal inverse CDF.
//!
//! Assumes jointly normal returns aggregated linearly, so it understates
//! tail risk when returns are fat-tailed.

use super::{is_low_sample, validate_inputs, EstimatorOptions, VarMethod, VarResult};
use crate::error::{Result, VarError};
use crate::horizon::scale_to_horizon;
use crate::portfolio::{AssetReturns, CovarianceEstimate, PortfolioWeights};
use statrs::distribution::{ContinuousCDF, Normal};

/// Parametric VaR from per-asset returns and weights
pub fn compute_parametric_var(
    returns: &AssetReturns,
    weights: &PortfolioWeights,
    confidence_level: f64,
    horizon: u32,
    notional: f64,
) -> Result<VarResult> {
    parametric_var(
        returns,
        weights,
        confidence_level,
        horizon,
        notional,
        &EstimatorOptions::default(),
    )
}

pub(crate) fn parametric_var(
    returns: &AssetReturns,
    weights: &PortfolioWeights,
    confidence_level: f64,
    horizon: u32,
    notional: f64,
    options: &EstimatorOptions,
) -> Result<VarResult> {
    validate_inputs(confidence_level, horizon, notional)?;
    let w = weights.aligned_to(returns, options.weight_tolerance)?;

    let estimate = CovarianceEstimate::from_returns(returns);
    estimate.ensure_full_rank_sample()?;
    estimate.ensure_positive_semi_definite()?;

    let (mean, std_dev) = estimate.portfolio_moments(&w)?;
    let z_score = z_score(confidence_level)?;
    let var_return = scale_to_horizon(mean + z_score * std_dev, horizon);

    tracing::debug!(
        assets = returns.asset_count(),
        observations = estimate.observations,
        mean,
        std_dev,
        z_score,
        var_return,
        "parametric VaR"
    );

    Ok(VarResult {
        method: VarMethod::Parametric,
        confidence_level,
        horizon,
        var_return,
        var_amount: var_return * notional,
        notional,
        observations: estimate.observations,
        low_confidence: is_low_sample(estimate.observations, options),
    })
}

/// Standard normal quantile at `1 - c` (e.g. -1.645 for 95%)
pub fn z_score(confidence_level: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| VarError::Numerical(e.to_string()))?;
    Ok(normal.inverse_cdf(1.0 - confidence_level))
}
