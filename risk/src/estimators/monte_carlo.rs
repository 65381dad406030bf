//! Monte Carlo VaR
//!
//! Samples correlated asset returns from the fitted joint normal model:
//!
//! 1. μ and Σ from the historical returns
//! 2. L with L·Lᵀ = Σ + εI (Cholesky; ε is a small stabilizing term)
//! 3. Z: `num_simulations × assets` independent standard normals
//! 4. R = Z·Lᵀ + μ reproduces the target covariance
//! 5. portfolio scenarios R·w, then the `(1 - c)` empirical quantile and √h
//!
//! The random source is always passed in; seed it for reproducible runs.

use super::{is_low_sample, validate_inputs, EstimatorOptions, VarMethod, VarResult};
use crate::control::Cancellation;
use crate::error::{Result, VarError};
use crate::horizon::scale_to_horizon;
use crate::portfolio::{AssetReturns, CovarianceEstimate, PortfolioWeights};
use crate::stats;
use nalgebra::{Cholesky, DMatrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Scenarios generated per batch; bounds the transient matrix size
const CHUNK_ROWS: usize = 4_096;

/// Monte Carlo VaR with simulation diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloVarResult {
    #[serde(flatten)]
    pub var: VarResult,

    /// Number of simulated scenarios
    pub num_simulations: usize,

    /// Mean of the simulated single-period portfolio returns
    pub simulated_mean: f64,

    /// Sample standard deviation of the simulated portfolio returns
    pub simulated_std: f64,

    /// Leading simulated portfolio returns, for plotting
    pub sample: Vec<f64>,
}

/// Monte Carlo VaR using the supplied random number generator
pub fn compute_monte_carlo_var<R: Rng + ?Sized>(
    returns: &AssetReturns,
    weights: &PortfolioWeights,
    confidence_level: f64,
    horizon: u32,
    notional: f64,
    num_simulations: usize,
    rng: &mut R,
) -> Result<MonteCarloVarResult> {
    let request = SimulationRequest {
        confidence_level,
        horizon,
        notional,
        num_simulations,
    };
    monte_carlo_var(returns, weights, &request, &EstimatorOptions::default(), None, rng)
}

/// Monte Carlo VaR seeded from `seed`, or from OS entropy when `None`
pub fn monte_carlo_var_seeded(
    returns: &AssetReturns,
    weights: &PortfolioWeights,
    confidence_level: f64,
    horizon: u32,
    notional: f64,
    num_simulations: usize,
    seed: Option<u64>,
) -> Result<MonteCarloVarResult> {
    let mut rng = seeded_rng(seed);
    compute_monte_carlo_var(
        returns,
        weights,
        confidence_level,
        horizon,
        notional,
        num_simulations,
        &mut rng,
    )
}

pub(crate) fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimulationRequest {
    pub confidence_level: f64,
    pub horizon: u32,
    pub notional: f64,
    pub num_simulations: usize,
}

pub(crate) fn monte_carlo_var<R: Rng + ?Sized>(
    returns: &AssetReturns,
    weights: &PortfolioWeights,
    request: &SimulationRequest,
    options: &EstimatorOptions,
    cancellation: Option<&Cancellation>,
    rng: &mut R,
) -> Result<MonteCarloVarResult> {
    let SimulationRequest {
        confidence_level,
        horizon,
        notional,
        num_simulations,
    } = *request;

    validate_inputs(confidence_level, horizon, notional)?;
    if num_simulations == 0 {
        return Err(VarError::InvalidParameter(
            "Number of simulations must be positive".to_string()
        ));
    }
    let w = weights.aligned_to(returns, options.weight_tolerance)?;

    let estimate = CovarianceEstimate::from_returns(returns);
    estimate.ensure_full_rank_sample()?;
    let l_transpose = cholesky_factor(&estimate.covariance, options.regularization)?.transpose();
    let assets = estimate.asset_count();

    let mut simulated = Vec::with_capacity(num_simulations);
    while simulated.len() < num_simulations {
        if let Some(token) = cancellation {
            token.check("Monte Carlo simulation")?;
        }

        let rows = CHUNK_ROWS.min(num_simulations - simulated.len());
        let draws: Vec<f64> = (0..rows * assets)
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();
        let z = DMatrix::from_row_slice(rows, assets, &draws);

        let mut scenarios = z * &l_transpose;
        for (mut column, mean) in scenarios.column_iter_mut().zip(estimate.means.iter()) {
            column.add_scalar_mut(*mean);
        }

        let portfolio = scenarios * &w;
        simulated.extend(portfolio.iter().copied());
    }

    let quantile = stats::quantile(&simulated, 1.0 - confidence_level)
        .ok_or_else(|| VarError::InsufficientData("No simulated scenarios".to_string()))?;
    let var_return = scale_to_horizon(quantile, horizon);
    let simulated_mean = stats::mean(&simulated);
    let simulated_std = stats::sample_std(&simulated);

    tracing::debug!(
        assets,
        observations = estimate.observations,
        num_simulations,
        simulated_mean,
        simulated_std,
        var_return,
        "Monte Carlo VaR"
    );

    simulated.truncate(options.sample_size);

    Ok(MonteCarloVarResult {
        var: VarResult {
            method: VarMethod::MonteCarlo,
            confidence_level,
            horizon,
            var_return,
            var_amount: var_return * notional,
            notional,
            observations: estimate.observations,
            low_confidence: is_low_sample(estimate.observations, options),
        },
        num_simulations,
        simulated_mean,
        simulated_std,
        sample: simulated,
    })
}

/// Lower-triangular L with L·Lᵀ = Σ + εI
pub fn cholesky_factor(covariance: &DMatrix<f64>, regularization: f64) -> Result<DMatrix<f64>> {
    let n = covariance.nrows();
    let regularized = covariance + DMatrix::<f64>::identity(n, n) * regularization;

    let not_pd = || VarError::Numerical("covariance matrix not positive definite".to_string());
    let l = Cholesky::new(regularized).ok_or_else(not_pd)?.l();

    if l.diagonal().iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return Err(not_pd());
    }
    Ok(l)
}
