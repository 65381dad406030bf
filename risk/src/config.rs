//! Engine configuration
//!
//! `VarConfig` is plain serde data, loadable from YAML or JSON documents.
//!
//! ```
//! use vaultvar_risk::VarConfig;
//!
//! let yaml = r#"
//! default_simulations: 50000
//! random_seed: 7
//! "#;
//!
//! let config = VarConfig::from_yaml(yaml).unwrap();
//! assert_eq!(config.default_simulations, 50_000);
//! assert_eq!(config.sample_size, 1_000); // unspecified fields keep their defaults
//! ```

use crate::error::{Result, VarError};
use crate::portfolio::DEFAULT_WEIGHT_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// VaR engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarConfig {
    /// Default number of Monte Carlo simulations
    pub default_simulations: usize,

    /// Number of simulated returns kept in Monte Carlo results for plotting
    pub sample_size: usize,

    /// Below this many observations results are flagged as low confidence
    pub low_sample_threshold: usize,

    /// Diagonal term added to the covariance before Cholesky factorization
    pub regularization: f64,

    /// Allowed deviation of the weight total from 1.0
    pub weight_tolerance: f64,

    /// Random seed for reproducible Monte Carlo (None = random)
    pub random_seed: Option<u64>,
}

impl Default for VarConfig {
    fn default() -> Self {
        Self {
            default_simulations: 10_000,
            sample_size: 1_000,
            low_sample_threshold: 20,
            regularization: 1e-10,
            weight_tolerance: DEFAULT_WEIGHT_TOLERANCE,
            random_seed: None,
        }
    }
}

impl VarConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: VarConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: VarConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            other => Err(VarError::Config(format!(
                "Unsupported config extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_simulations == 0 {
            return Err(VarError::Config(
                "default_simulations must be positive".to_string()
            ));
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(VarError::Config(format!(
                "regularization must be a non-negative number, got {}",
                self.regularization
            )));
        }
        if !self.weight_tolerance.is_finite() || self.weight_tolerance < 0.0 {
            return Err(VarError::Config(format!(
                "weight_tolerance must be a non-negative number, got {}",
                self.weight_tolerance
            )));
        }
        Ok(())
    }
}
