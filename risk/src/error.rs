//! Error types for the VaR engine

use thiserror::Error;

/// Errors that can occur while building returns or estimating risk
#[derive(Error, Debug)]
pub enum VarError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid confidence level: {0} (must be between 0 and 1)")]
    InvalidConfidenceLevel(f64),

    #[error("Invalid time horizon: {0} (must be at least 1 period)")]
    InvalidTimeHorizon(u32),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Misaligned return series: {0}")]
    Alignment(String),

    #[error("Price data error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calculation cancelled: {0}")]
    Cancelled(String),
}

/// Failures reported by price-history providers and tabular loaders
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("no price data returned for {0}")]
    Empty(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Coarse error classification callers can map to user-facing responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidParameter,
    InsufficientData,
    Numerical,
    Alignment,
    Provider,
    Config,
    Cancelled,
}

impl VarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VarError::InvalidParameter(_)
            | VarError::InvalidConfidenceLevel(_)
            | VarError::InvalidTimeHorizon(_) => ErrorKind::InvalidParameter,
            VarError::InsufficientData(_) => ErrorKind::InsufficientData,
            VarError::Numerical(_) => ErrorKind::Numerical,
            VarError::Alignment(_) => ErrorKind::Alignment,
            VarError::Provider(_) | VarError::Io(_) => ErrorKind::Provider,
            VarError::Config(_) | VarError::Yaml(_) | VarError::Json(_) => ErrorKind::Config,
            VarError::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

pub type Result<T> = std::result::Result<T, VarError>;
