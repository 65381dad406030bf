//! Historical simulation VaR
//!
//! Formula: VaR = percentile(returns, 1 - c) * √h, and `* N` for currency.
//! No distributional assumption; limited to what the lookback window saw.

use super::{is_low_sample, validate_inputs, validate_sample, EstimatorOptions, VarMethod, VarResult};
use crate::error::{Result, VarError};
use crate::horizon::scale_to_horizon;
use crate::stats;

/// Historical VaR of a portfolio return series
pub fn compute_historical_var(
    returns: &[f64],
    confidence_level: f64,
    horizon: u32,
    notional: f64,
) -> Result<VarResult> {
    historical_var(returns, confidence_level, horizon, notional, &EstimatorOptions::default())
}

pub(crate) fn historical_var(
    returns: &[f64],
    confidence_level: f64,
    horizon: u32,
    notional: f64,
    options: &EstimatorOptions,
) -> Result<VarResult> {
    validate_inputs(confidence_level, horizon, notional)?;
    validate_sample(returns)?;

    let quantile = single_period_quantile(returns, confidence_level)?;
    let var_return = scale_to_horizon(quantile, horizon);

    tracing::debug!(
        observations = returns.len(),
        confidence_level,
        horizon,
        var_return,
        "historical VaR"
    );

    Ok(VarResult {
        method: VarMethod::Historical,
        confidence_level,
        horizon,
        var_return,
        var_amount: var_return * notional,
        notional,
        observations: returns.len(),
        low_confidence: is_low_sample(returns.len(), options),
    })
}

/// Unscaled `(1 - c)` empirical quantile, shared with Expected Shortfall
pub(crate) fn single_period_quantile(returns: &[f64], confidence_level: f64) -> Result<f64> {
    stats::quantile(returns, 1.0 - confidence_level)
        .ok_or_else(|| VarError::InsufficientData("Empty return series".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_returns() -> Vec<f64> {
        vec![
            -0.05, -0.03, -0.02, -0.01, 0.00,
            0.01, 0.02, 0.03, 0.04, 0.05,
            -0.04, 0.01, 0.02, -0.01, 0.03,
            0.00, -0.02, 0.01, 0.02, -0.01,
        ]
    }

    #[test]
    fn test_historical_var() {
        let result = compute_historical_var(&create_test_returns(), 0.95, 1, 10_000.0).unwrap();

        // sorted[0] = -0.05, sorted[1] = -0.04, rank = 0.05 * 19 = 0.95
        assert_relative_eq!(result.var_return, -0.05 + 0.95 * 0.01, epsilon = 1e-12);
        assert_relative_eq!(result.var_amount, result.var_return * 10_000.0);
        assert_eq!(result.method, VarMethod::Historical);
        assert_eq!(result.observations, 20);
        assert!(!result.low_confidence);
    }

    #[test]
    fn test_horizon_scaling_is_exact() {
        let returns = create_test_returns();
        let one = compute_historical_var(&returns, 0.99, 1, 1.0).unwrap();
        let ten = compute_historical_var(&returns, 0.99, 10, 1.0).unwrap();
        assert_eq!(ten.var_return, one.var_return * 10f64.sqrt());
    }

    #[test]
    fn test_small_sample_flagged_not_rejected() {
        let result = compute_historical_var(&[0.01, -0.02, 0.005], 0.95, 1, 1_000.0).unwrap();
        assert!(result.low_confidence);
        assert_eq!(result.observations, 3);
    }

    #[test]
    fn test_invalid_inputs() {
        let returns = create_test_returns();
        assert!(matches!(
            compute_historical_var(&returns, 1.5, 1, 1.0),
            Err(VarError::InvalidConfidenceLevel(_))
        ));
        assert!(matches!(
            compute_historical_var(&returns, 0.95, 0, 1.0),
            Err(VarError::InvalidTimeHorizon(0))
        ));
        assert!(matches!(
            compute_historical_var(&[0.01], 0.95, 1, 1.0),
            Err(VarError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_deterministic() {
        let returns = create_test_returns();
        let a = compute_historical_var(&returns, 0.95, 5, 250_000.0).unwrap();
        let b = compute_historical_var(&returns, 0.95, 5, 250_000.0).unwrap();
        assert_eq!(a, b);
    }
}
