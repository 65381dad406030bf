//! Expected Shortfall (Conditional VaR)
//!
//! ES is the average of the observed returns at or below the single-period
//! historical VaR threshold. It is never less severe than VaR itself.

use super::historical::single_period_quantile;
use super::{validate_confidence, validate_notional, validate_sample};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Expected Shortfall result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedShortfallResult {
    /// Confidence level (e.g., 0.95, 0.99)
    pub confidence_level: f64,

    /// Average return in the tail (negative = loss)
    pub es_return: f64,

    /// `es_return * notional`
    pub es_amount: f64,

    pub notional: f64,

    /// Historical VaR threshold the tail was cut at
    pub threshold: f64,

    /// Number of observations at or below the threshold
    pub tail_observations: usize,
}

/// Expected Shortfall of a portfolio return series
pub fn compute_expected_shortfall(
    returns: &[f64],
    confidence_level: f64,
    notional: f64,
) -> Result<ExpectedShortfallResult> {
    validate_confidence(confidence_level)?;
    validate_notional(notional)?;
    validate_sample(returns)?;

    let threshold = single_period_quantile(returns, confidence_level)?;

    let (tail_sum, tail_observations) = returns
        .iter()
        .filter(|r| **r <= threshold)
        .fold((0.0, 0usize), |(sum, count), r| (sum + r, count + 1));

    // The linear quantile never falls below the smallest observation, so the
    // tail holds at least one value; an empty tail would report the threshold.
    // The cap keeps ES at or below the threshold.
    let es_return = if tail_observations == 0 {
        threshold
    } else {
        (tail_sum / tail_observations as f64).min(threshold)
    };

    tracing::debug!(confidence_level, threshold, es_return, tail_observations, "expected shortfall");

    Ok(ExpectedShortfallResult {
        confidence_level,
        es_return,
        es_amount: es_return * notional,
        notional,
        threshold,
        tail_observations,
    })
}
