use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use vaultvar_risk::{PerformanceSummary, VarReport};

/// Everything printed for one run
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub tickers: Vec<String>,
    pub periods: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub report: VarReport,
    pub performance: PerformanceSummary,
}

impl RunOutput {
    pub fn log_summary(&self) {
        let report = &self.report;
        info!(
            "VaR at {:.1}% over {} period(s) on {:.2}",
            report.confidence_level * 100.0,
            report.horizon,
            report.notional
        );
        for result in [&report.historical, &report.parametric, &report.monte_carlo.var] {
            info!(
                "  {:<12} {:>9.4}%  {:>14.2}",
                result.method.to_string(),
                result.var_return * 100.0,
                result.var_amount
            );
        }
        info!(
            "  {:<12} {:>9.4}%  {:>14.2}",
            "shortfall",
            report.expected_shortfall.es_return * 100.0,
            report.expected_shortfall.es_amount
        );

        if report.historical.low_confidence {
            warn!(
                "Only {} observations; estimates are statistically unreliable",
                report.historical.observations
            );
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
