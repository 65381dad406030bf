//! Performance metrics over a portfolio return series
//!
//! - Cumulative return curve: ∏(1 + r) - 1 at every period
//! - Maximum drawdown: largest peak-to-trough decline of the wealth curve
//! - Sharpe ratio: (mean - rf/252) / σ, annualized by √252
//! - Volatility, compound annualized return, win rate
//!
//! Ratios with a zero denominator report 0 instead of failing.

use crate::error::{Result, VarError};
use crate::stats;
use serde::{Deserialize, Serialize};

/// Trading periods per year used for annualization
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Summary statistics of a return series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub observations: usize,

    /// Mean per-period return
    pub mean_return: f64,

    /// Per-period sample standard deviation
    pub volatility: f64,

    /// (1 + mean)^252 - 1
    pub annualized_return: f64,

    /// volatility * √252
    pub annualized_volatility: f64,

    /// Annualized Sharpe ratio; 0 when volatility is 0
    pub sharpe_ratio: f64,

    /// Compounded return over the whole series
    pub total_return: f64,

    /// Most negative drawdown of the wealth curve (<= 0)
    pub max_drawdown: f64,

    /// Fraction of periods with a positive return
    pub win_rate: f64,
}

impl PerformanceSummary {
    /// Summarize `returns` against an annual risk-free rate
    pub fn from_returns(returns: &[f64], risk_free_rate: f64) -> Result<Self> {
        if returns.len() < 2 {
            return Err(VarError::InsufficientData(format!(
                "Need at least 2 returns for performance metrics, got {}",
                returns.len()
            )));
        }

        let mean_return = stats::mean(returns);
        let volatility = stats::sample_std(returns);
        let curve = cumulative_returns(returns);
        let wins = returns.iter().filter(|r| **r > 0.0).count();

        Ok(Self {
            observations: returns.len(),
            mean_return,
            volatility,
            annualized_return: (1.0 + mean_return).powf(PERIODS_PER_YEAR) - 1.0,
            annualized_volatility: volatility * PERIODS_PER_YEAR.sqrt(),
            sharpe_ratio: sharpe_ratio(returns, risk_free_rate),
            total_return: curve.last().copied().unwrap_or(0.0),
            max_drawdown: max_drawdown(returns),
            win_rate: wins as f64 / returns.len() as f64,
        })
    }
}

/// Running compounded return after each period
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |wealth, r| {
            *wealth *= 1.0 + r;
            Some(*wealth - 1.0)
        })
        .collect()
}

/// Largest peak-to-trough decline as a (non-positive) fraction of the peak
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut peak = 1.0_f64;
    let mut wealth = 1.0_f64;
    let mut max_dd = 0.0_f64;

    for r in returns {
        wealth *= 1.0 + r;
        peak = peak.max(wealth);
        if peak > 0.0 {
            max_dd = max_dd.min((wealth - peak) / peak);
        }
    }

    max_dd
}

/// Annualized Sharpe ratio; 0 when the series has no variance
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let std_dev = stats::sample_std(returns);
    if std_dev == 0.0 || !std_dev.is_finite() {
        return 0.0;
    }

    let daily_rf = risk_free_rate / PERIODS_PER_YEAR;
    (stats::mean(returns) - daily_rf) / std_dev * PERIODS_PER_YEAR.sqrt()
}
