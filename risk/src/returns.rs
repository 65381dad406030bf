//! Return series construction
//!
//! Converts ordered price sequences into periodic simple returns,
//! `(p[t] - p[t-1]) / p[t-1]`. Missing or non-positive prices are rejected,
//! never imputed.

use crate::error::{Result, VarError};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Per-period simple returns of a single asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReturnSeries(Vec<f64>);

impl ReturnSeries {
    /// Wrap an existing sequence of fractional returns (e.g. a "returns" column)
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for ReturnSeries {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for ReturnSeries {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Build simple returns from an ordered price sequence.
///
/// Produces exactly `prices.len() - 1` values.
pub fn simple_returns(prices: &[f64]) -> Result<ReturnSeries> {
    if prices.len() < 2 {
        return Err(VarError::InsufficientData(format!(
            "Need at least 2 prices to form a return, got {}",
            prices.len()
        )));
    }

    if let Some((index, price)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(VarError::InvalidParameter(format!(
            "Price at index {} must be finite and strictly positive, got {}",
            index, price
        )));
    }

    let returns = prices
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();

    Ok(ReturnSeries(returns))
}
