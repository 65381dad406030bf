//! VaR calculation example
//!
//! Computes historical, parametric and Monte Carlo VaR plus Expected
//! Shortfall for a small two-asset portfolio.
//!
//! Run with: cargo run --example calculate_var

use vaultvar_risk::{build_asset_returns, PerformanceSummary, PortfolioWeights, VarConfig, VarEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Value at Risk (VaR) Calculation Example ===\n");

    // 1. Build 120 days of prices for two assets and turn them into returns
    let mut equity = vec![100.0];
    let mut bonds = vec![100.0];
    for i in 1..=120 {
        let shock = ((i * 17) % 100) as f64 / 100.0 - 0.5;
        let last_equity = equity[i - 1];
        let last_bonds = bonds[i - 1];
        equity.push(last_equity * (1.0 + (i as f64 * 0.1).sin() * 0.012 + shock * 0.01));
        bonds.push(last_bonds * (1.0 + (i as f64 * 0.07).cos() * 0.003 - shock * 0.002));
    }

    let returns = build_asset_returns(vec![("EQUITY", equity), ("BONDS", bonds)])?;
    let weights = PortfolioWeights::from_pairs([("EQUITY", 0.6), ("BONDS", 0.4)]);

    let correlation = VarEngine::default().correlation_matrix(&returns);
    println!("Observations: {}", returns.observations());
    println!("Equity/bond correlation: {:.3}", correlation[(0, 1)]);
    println!();

    // 2. Engine with a fixed seed for reproducible Monte Carlo
    let engine = VarEngine::new(VarConfig {
        default_simulations: 20_000,
        random_seed: Some(42),
        ..Default::default()
    });

    let notional = 1_000_000.0;
    let confidence_level = 0.95;

    println!("Portfolio: ${:.0}", notional);
    println!("Confidence Level: {}%", confidence_level * 100.0);
    println!();

    // 3. All methods at 1 and 10 days
    for horizon in [1, 10] {
        let report = engine.compute_all(&returns, &weights, confidence_level, horizon, notional)?;

        println!("--- Horizon: {} day(s) ---", horizon);
        for result in [&report.historical, &report.parametric, &report.monte_carlo.var] {
            println!(
                "  {:<12} {:>8.4}%  ${:>12.2}{}",
                result.method.to_string(),
                result.var_return * 100.0,
                result.var_amount,
                if result.low_confidence { "  (low sample)" } else { "" }
            );
        }
        println!(
            "  {:<12} {:>8.4}%  ${:>12.2}",
            "ES (1 day)",
            report.expected_shortfall.es_return * 100.0,
            report.expected_shortfall.es_amount
        );
        println!();
    }

    // 4. Performance of the weighted portfolio
    let series = engine.portfolio_returns(&returns, &weights)?;
    let summary = PerformanceSummary::from_returns(&series, 0.02)?;
    println!("--- Performance ---");
    println!("  Annualized return: {:.2}%", summary.annualized_return * 100.0);
    println!("  Annualized volatility: {:.2}%", summary.annualized_volatility * 100.0);
    println!("  Sharpe ratio: {:.2}", summary.sharpe_ratio);
    println!("  Max drawdown: {:.2}%", summary.max_drawdown * 100.0);

    Ok(())
}
