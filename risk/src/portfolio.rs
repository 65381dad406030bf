//! Multi-asset return alignment and portfolio aggregation
//!
//! Provides:
//! - Aligned per-asset return columns (`AssetReturns`)
//! - Validated portfolio weights (`PortfolioWeights`)
//! - Weighted portfolio return series (`portfolio_returns`)
//! - Sample mean vector and covariance matrix (`CovarianceEstimate`)
//! - Correlation diagnostics

use crate::error::{Result, VarError};
use crate::returns::{simple_returns, ReturnSeries};
use crate::stats;
use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Default tolerance on `|sum(weights) - 1|`
pub const DEFAULT_WEIGHT_TOLERANCE: f64 = 0.01;

/// Per-asset return columns aligned by period index.
///
/// Deserialization goes through [`AssetReturns::new`], so serialized data is
/// held to the same alignment rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAssetReturns")]
pub struct AssetReturns {
    assets: Vec<String>,
    columns: Vec<ReturnSeries>,
}

impl AssetReturns {
    /// Create from named return columns.
    ///
    /// All columns must have the same length; at least 2 rows are required.
    pub fn new<S: Into<String>>(columns: Vec<(S, ReturnSeries)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(VarError::InsufficientData(
                "No asset return columns provided".to_string()
            ));
        }

        let mut assets = Vec::with_capacity(columns.len());
        let mut series = Vec::with_capacity(columns.len());
        for (name, column) in columns {
            let name = name.into();
            if assets.contains(&name) {
                return Err(VarError::InvalidParameter(format!(
                    "Asset {} appears more than once",
                    name
                )));
            }
            assets.push(name);
            series.push(column);
        }

        let num_obs = series[0].len();
        for (asset, column) in assets.iter().zip(series.iter()) {
            if column.len() != num_obs {
                return Err(VarError::Alignment(format!(
                    "Asset {} has {} observations, expected {}",
                    asset,
                    column.len(),
                    num_obs
                )));
            }
            if let Some(bad) = column.iter().find(|r| !r.is_finite()) {
                return Err(VarError::InvalidParameter(format!(
                    "Asset {} contains a non-finite return ({})",
                    asset, bad
                )));
            }
        }

        if num_obs < 2 {
            return Err(VarError::InsufficientData(format!(
                "Need at least 2 aligned return rows, got {}",
                num_obs
            )));
        }

        Ok(Self {
            assets,
            columns: series,
        })
    }

    /// Convenience constructor for a single asset
    pub fn single(asset: impl Into<String>, returns: ReturnSeries) -> Result<Self> {
        Self::new(vec![(asset.into(), returns)])
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn observations(&self) -> usize {
        self.columns[0].len()
    }

    pub fn column(&self, asset: &str) -> Option<&ReturnSeries> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| &self.columns[i])
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &ReturnSeries)> {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter())
    }

    /// Observations × assets return matrix
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.observations(), self.asset_count(), |row, col| {
            self.columns[col][row]
        })
    }
}

/// Serialized shape of `AssetReturns`, validated on conversion
#[derive(Deserialize)]
struct RawAssetReturns {
    assets: Vec<String>,
    columns: Vec<ReturnSeries>,
}

impl TryFrom<RawAssetReturns> for AssetReturns {
    type Error = VarError;

    fn try_from(raw: RawAssetReturns) -> Result<Self> {
        if raw.assets.len() != raw.columns.len() {
            return Err(VarError::Alignment(format!(
                "{} asset names for {} return columns",
                raw.assets.len(),
                raw.columns.len()
            )));
        }
        AssetReturns::new(raw.assets.into_iter().zip(raw.columns).collect())
    }
}

/// Build aligned asset returns from named price columns.
///
/// Price columns of differing length are a usage error; gaps must be
/// forward-filled or dropped before calling (see `data::align_price_histories`).
pub fn build_asset_returns<S: Into<String>>(prices: Vec<(S, Vec<f64>)>) -> Result<AssetReturns> {
    let prices: Vec<(String, Vec<f64>)> = prices
        .into_iter()
        .map(|(name, column)| (name.into(), column))
        .collect();

    if let Some((first_asset, first)) = prices.first() {
        for (asset, column) in &prices[1..] {
            if column.len() != first.len() {
                return Err(VarError::Alignment(format!(
                    "Asset {} has {} prices but {} has {}",
                    asset,
                    column.len(),
                    first_asset,
                    first.len()
                )));
            }
        }
    }

    let columns = prices
        .into_iter()
        .map(|(name, column)| simple_returns(&column).map(|r| (name, r)))
        .collect::<Result<Vec<_>>>()?;

    AssetReturns::new(columns)
}

/// Asset identifier to weight mapping, in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioWeights(IndexMap<String, f64>);

impl PortfolioWeights {
    pub fn new(weights: IndexMap<String, f64>) -> Self {
        Self(weights)
    }

    pub fn from_pairs<S, I>(pairs: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, f64)>,
    {
        Self(pairs.into_iter().map(|(a, w)| (a.into(), w)).collect())
    }

    /// Equal weights across the given assets
    pub fn equal<S: Into<String>>(assets: impl IntoIterator<Item = S>) -> Self {
        let assets: Vec<String> = assets.into_iter().map(Into::into).collect();
        let weight = 1.0 / assets.len().max(1) as f64;
        Self(assets.into_iter().map(|a| (a, weight)).collect())
    }

    pub fn get(&self, asset: &str) -> Option<f64> {
        self.0.get(asset).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(a, w)| (a.as_str(), *w))
    }

    /// Check every weight is finite and the total is within `tolerance` of 1
    pub fn validate(&self, tolerance: f64) -> Result<()> {
        if self.0.is_empty() {
            return Err(VarError::InvalidParameter(
                "No portfolio weights provided".to_string()
            ));
        }

        if let Some((asset, weight)) = self.0.iter().find(|(_, w)| !w.is_finite()) {
            return Err(VarError::InvalidParameter(format!(
                "Weight for {} is not finite: {}",
                asset, weight
            )));
        }

        let total = self.sum();
        if (total - 1.0).abs() > tolerance {
            return Err(VarError::InvalidParameter(format!(
                "Weights must sum to 1.0 (±{}), got {:.6}",
                tolerance, total
            )));
        }

        Ok(())
    }

    /// Validate and return the weight vector in the column order of `returns`
    pub fn aligned_to(&self, returns: &AssetReturns, tolerance: f64) -> Result<DVector<f64>> {
        self.validate(tolerance)?;

        if let Some(extra) = self.0.keys().find(|a| returns.column(a).is_none()) {
            return Err(VarError::InvalidParameter(format!(
                "Weight given for unknown asset {}",
                extra
            )));
        }

        let weights = returns
            .assets()
            .iter()
            .map(|asset| {
                self.get(asset).ok_or_else(|| {
                    VarError::InvalidParameter(format!("Missing weight for asset {}", asset))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(DVector::from_vec(weights))
    }
}

/// Weighted portfolio return per period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioReturnSeries(Vec<f64>);

impl PortfolioReturnSeries {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for PortfolioReturnSeries {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<ReturnSeries> for PortfolioReturnSeries {
    fn from(series: ReturnSeries) -> Self {
        Self(series.into_inner())
    }
}

impl From<Vec<f64>> for PortfolioReturnSeries {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Combine aligned asset returns into a portfolio series: `R · w` per period
pub fn portfolio_returns(
    returns: &AssetReturns,
    weights: &PortfolioWeights,
    tolerance: f64,
) -> Result<PortfolioReturnSeries> {
    let w = weights.aligned_to(returns, tolerance)?;
    let combined = returns.to_matrix() * w;
    Ok(PortfolioReturnSeries(combined.iter().copied().collect()))
}

/// Sample mean vector and covariance matrix of the asset return columns
#[derive(Debug, Clone)]
pub struct CovarianceEstimate {
    pub means: DVector<f64>,
    pub covariance: DMatrix<f64>,
    pub observations: usize,
}

impl CovarianceEstimate {
    /// Estimate with the unbiased (n - 1) denominator
    pub fn from_returns(returns: &AssetReturns) -> Self {
        let data = returns.to_matrix();
        let n = data.nrows();

        // Constant columns get their exact value as mean and exactly zero
        // (co)variance instead of rounding residue
        let constant: Vec<bool> = returns
            .columns()
            .map(|(_, column)| stats::is_constant(column))
            .collect();

        let means = DVector::from_iterator(
            data.ncols(),
            data.column_iter()
                .zip(&constant)
                .map(|(c, flat)| if *flat { c[0] } else { c.sum() / n as f64 }),
        );

        let mut centered = data;
        for ((mut column, mean), flat) in centered
            .column_iter_mut()
            .zip(means.iter())
            .zip(&constant)
        {
            if *flat {
                column.fill(0.0);
            } else {
                column.add_scalar_mut(-mean);
            }
        }

        let mut covariance = centered.transpose() * &centered / (n - 1) as f64;
        // Force exact symmetry; the product can differ in the last bit.
        covariance = (&covariance + covariance.transpose()) * 0.5;

        Self {
            means,
            covariance,
            observations: n,
        }
    }

    pub fn asset_count(&self) -> usize {
        self.means.len()
    }

    /// A sample with fewer than `assets + 1` rows cannot span the asset space
    pub fn ensure_full_rank_sample(&self) -> Result<()> {
        if self.asset_count() + 1 > self.observations {
            return Err(VarError::Numerical(format!(
                "Covariance matrix is rank deficient: {} assets need at least {} observations, got {}",
                self.asset_count(),
                self.asset_count() + 1,
                self.observations
            )));
        }
        Ok(())
    }

    /// Reject matrices with an eigenvalue materially below zero
    pub fn ensure_positive_semi_definite(&self) -> Result<()> {
        let eigen = SymmetricEigen::new(self.covariance.clone());
        let largest = eigen
            .eigenvalues
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let smallest = eigen
            .eigenvalues
            .iter()
            .fold(f64::INFINITY, |acc, v| acc.min(*v));
        let tolerance = (largest * self.asset_count() as f64 * f64::EPSILON).max(1e-18);

        if smallest < -tolerance {
            return Err(VarError::Numerical(format!(
                "Covariance matrix is not positive semi-definite (smallest eigenvalue {:e})",
                smallest
            )));
        }
        Ok(())
    }

    /// Portfolio mean `w·μ` and standard deviation `√(wᵀΣw)`
    pub fn portfolio_moments(&self, weights: &DVector<f64>) -> Result<(f64, f64)> {
        let mean = weights.dot(&self.means);
        let variance = (weights.transpose() * &self.covariance * weights)[(0, 0)];

        if variance < 0.0 {
            // Rounding on a PSD matrix can leave a tiny negative residue.
            if variance > -1e-15 {
                return Ok((mean, 0.0));
            }
            return Err(VarError::Numerical(format!(
                "Negative portfolio variance: {}",
                variance
            )));
        }

        Ok((mean, variance.sqrt()))
    }

    /// Correlation matrix derived from the covariance.
    ///
    /// Zero-variance assets get 0 off-diagonal correlation and 1 on the diagonal.
    pub fn correlation_matrix(&self) -> DMatrix<f64> {
        let k = self.asset_count();
        let std: Vec<f64> = (0..k).map(|i| self.covariance[(i, i)].max(0.0).sqrt()).collect();
        DMatrix::from_fn(k, k, |i, j| {
            if i == j {
                1.0
            } else if std[i] == 0.0 || std[j] == 0.0 {
                0.0
            } else {
                (self.covariance[(i, j)] / (std[i] * std[j])).clamp(-1.0, 1.0)
            }
        })
    }
}

/// Pearson correlation between two assets' returns
pub fn pair_correlation(returns: &AssetReturns, a: &str, b: &str) -> Result<f64> {
    let lookup = |asset: &str| {
        returns.column(asset).ok_or_else(|| {
            VarError::InvalidParameter(format!("Unknown asset {}", asset))
        })
    };
    Ok(stats::correlation(lookup(a)?, lookup(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_assets() -> AssetReturns {
        AssetReturns::new(vec![
            ("A", ReturnSeries::new(vec![0.01, 0.02, -0.01, 0.03, -0.02])),
            ("B", ReturnSeries::new(vec![0.02, 0.01, -0.02, 0.02, -0.01])),
        ])
        .unwrap()
    }

    #[test]
    fn test_misaligned_columns_rejected() {
        let err = AssetReturns::new(vec![
            ("A", ReturnSeries::new(vec![0.01, 0.02, 0.03])),
            ("B", ReturnSeries::new(vec![0.01, 0.02])),
        ])
        .unwrap_err();
        assert!(matches!(err, VarError::Alignment(_)));
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let err = AssetReturns::single("A", ReturnSeries::new(vec![0.01])).unwrap_err();
        assert!(matches!(err, VarError::InsufficientData(_)));
    }

    #[test]
    fn test_build_asset_returns_from_prices() {
        let returns = build_asset_returns(vec![
            ("A", vec![100.0, 101.0, 102.01]),
            ("B", vec![50.0, 49.0, 49.98]),
        ])
        .unwrap();
        assert_eq!(returns.observations(), 2);
        assert_relative_eq!(returns.column("A").unwrap()[0], 0.01, epsilon = 1e-12);
        assert_relative_eq!(returns.column("B").unwrap()[1], 0.02, epsilon = 1e-12);

        let err = build_asset_returns(vec![("A", vec![1.0, 2.0, 3.0]), ("B", vec![1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(err, VarError::Alignment(_)));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let weights = PortfolioWeights::from_pairs([("A", 0.6), ("B", 0.6)]);
        let err = weights.validate(DEFAULT_WEIGHT_TOLERANCE).unwrap_err();
        assert!(matches!(err, VarError::InvalidParameter(_)));

        let weights = PortfolioWeights::from_pairs([("A", 0.505), ("B", 0.5)]);
        assert!(weights.validate(DEFAULT_WEIGHT_TOLERANCE).is_ok());
    }

    #[test]
    fn test_weights_follow_column_order() {
        let weights = PortfolioWeights::from_pairs([("B", 0.3), ("A", 0.7)]);
        let w = weights.aligned_to(&two_assets(), DEFAULT_WEIGHT_TOLERANCE).unwrap();
        assert_eq!(w.as_slice(), &[0.7, 0.3]);

        let missing = PortfolioWeights::from_pairs([("A", 1.0)]);
        assert!(missing.aligned_to(&two_assets(), DEFAULT_WEIGHT_TOLERANCE).is_err());

        let unknown = PortfolioWeights::from_pairs([("A", 0.5), ("B", 0.25), ("C", 0.25)]);
        assert!(unknown.aligned_to(&two_assets(), DEFAULT_WEIGHT_TOLERANCE).is_err());
    }

    #[test]
    fn test_portfolio_returns_dot_product() {
        let weights = PortfolioWeights::from_pairs([("A", 0.5), ("B", 0.5)]);
        let series = portfolio_returns(&two_assets(), &weights, DEFAULT_WEIGHT_TOLERANCE).unwrap();
        let expected = [0.015, 0.015, -0.015, 0.025, -0.015];
        assert_eq!(series.len(), expected.len());
        for (got, want) in series.iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_covariance_matches_manual_computation() {
        let estimate = CovarianceEstimate::from_returns(&two_assets());
        let a = [0.01, 0.02, -0.01, 0.03, -0.02];
        let b = [0.02, 0.01, -0.02, 0.02, -0.01];
        let (ma, mb) = (stats::mean(&a), stats::mean(&b));
        let cov_ab: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - ma) * (y - mb)).sum::<f64>() / 4.0;

        assert_relative_eq!(estimate.means[0], ma, epsilon = 1e-15);
        assert_relative_eq!(estimate.covariance[(0, 1)], cov_ab, epsilon = 1e-15);
        assert_eq!(estimate.covariance[(0, 1)], estimate.covariance[(1, 0)]);
        assert_relative_eq!(
            estimate.covariance[(0, 0)].sqrt(),
            stats::sample_std(&a),
            epsilon = 1e-12
        );
        assert!(estimate.ensure_positive_semi_definite().is_ok());
        assert!(estimate.ensure_full_rank_sample().is_ok());
    }

    #[test]
    fn test_rank_deficient_sample_detected() {
        let returns = AssetReturns::new(vec![
            ("A", ReturnSeries::new(vec![0.01, 0.02])),
            ("B", ReturnSeries::new(vec![0.02, -0.01])),
            ("C", ReturnSeries::new(vec![-0.01, 0.03])),
        ])
        .unwrap();
        let estimate = CovarianceEstimate::from_returns(&returns);
        assert!(matches!(
            estimate.ensure_full_rank_sample(),
            Err(VarError::Numerical(_))
        ));
    }

    #[test]
    fn test_deserialize_validates_alignment() {
        let ragged = r#"{"assets":["A","B"],"columns":[[0.01,0.02,-0.01],[0.02]]}"#;
        let err = serde_json::from_str::<AssetReturns>(ragged).unwrap_err();
        assert!(err.to_string().contains("Misaligned"));

        let unnamed = r#"{"assets":["A"],"columns":[[0.01,0.02],[0.03,0.04]]}"#;
        assert!(serde_json::from_str::<AssetReturns>(unnamed).is_err());

        let empty = r#"{"assets":[],"columns":[]}"#;
        assert!(serde_json::from_str::<AssetReturns>(empty).is_err());

        let returns = two_assets();
        let json = serde_json::to_string(&returns).unwrap();
        assert_eq!(serde_json::from_str::<AssetReturns>(&json).unwrap(), returns);
    }

    #[test]
    fn test_constant_column_has_exact_zero_correlation() {
        let returns = AssetReturns::new(vec![
            ("A", ReturnSeries::new((0..20).map(|i| (i % 7) as f64 * 0.003 - 0.01).collect())),
            ("FLAT", ReturnSeries::new(vec![0.01; 20])),
        ])
        .unwrap();
        let estimate = CovarianceEstimate::from_returns(&returns);

        assert_eq!(estimate.means[1], 0.01);
        assert_eq!(estimate.covariance[(1, 1)], 0.0);
        assert_eq!(estimate.covariance[(0, 1)], 0.0);

        let corr = estimate.correlation_matrix();
        assert_eq!(corr[(0, 1)], 0.0);
        assert_eq!(corr[(1, 0)], 0.0);
        assert_eq!(pair_correlation(&returns, "A", "FLAT").unwrap(), 0.0);
    }

    #[test]
    fn test_correlation_matrix_diagonal_and_symmetry() {
        let corr = CovarianceEstimate::from_returns(&two_assets()).correlation_matrix();
        assert_eq!(corr[(0, 0)], 1.0);
        assert_eq!(corr[(1, 1)], 1.0);
        assert_relative_eq!(corr[(0, 1)], corr[(1, 0)]);
        assert_relative_eq!(
            corr[(0, 1)],
            pair_correlation(&two_assets(), "A", "B").unwrap(),
            epsilon = 1e-12
        );
    }
}
