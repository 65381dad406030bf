//! Horizon scaling
//!
//! Single-period results are scaled to an `h`-period horizon with the
//! square-root-of-time rule. This is an approximation: it holds for i.i.d.
//! returns without serial correlation, not as an exact law. Every estimator
//! applies it to the return-space quantile, before conversion to currency,
//! so results from different methods stay comparable.

use crate::error::{Result, VarError};

/// `√h`
pub fn horizon_scale(periods: u32) -> f64 {
    (periods as f64).sqrt()
}

pub fn validate_horizon(periods: u32) -> Result<()> {
    if periods == 0 {
        return Err(VarError::InvalidTimeHorizon(periods));
    }
    Ok(())
}

/// Scale a single-period fractional return to `periods`
pub fn scale_to_horizon(single_period: f64, periods: u32) -> f64 {
    single_period * horizon_scale(periods)
}
