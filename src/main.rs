use anyhow::{Context, Result};
use log::{info, warn};
use std::env;
use std::fs;

use defi_portfolio::advisor;
use defi_portfolio::config::AppConfig;
use defi_portfolio::optimizer;
use defi_portfolio::portfolio::Position;
use defi_portfolio::protocol::ProtocolCatalog;
use defi_portfolio::risk;
use defi_portfolio::scenarios;

fn main() -> Result<()> {
    // Initialize logger with default info level if RUST_LOG not set
    if env::var("RUST_LOG").is_err() {
        unsafe {
            env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();
    info!("Starting portfolio analyzer");

    // Get config file from command line argument or use default
    let args: Vec<String> = env::args().collect();
    let config_file = if args.len() > 1 {
        &args[1]
    } else {
        "config.json"
    };

    info!("Loading configuration from: {}", config_file);
    let config = AppConfig::load_from_file(config_file)?;

    let catalog: ProtocolCatalog = read_json(&config.catalog_file)
        .with_context(|| format!("failed to load catalog from {}", config.catalog_file))?;
    let positions: Vec<Position> = read_json(&config.portfolio_file)
        .with_context(|| format!("failed to load portfolio from {}", config.portfolio_file))?;
    info!(
        "Loaded {} catalog protocols, {} portfolio positions",
        catalog.len(),
        positions.len()
    );

    let analysis = risk::evaluate_portfolio_risk(&positions, &catalog, &config.market)
        .context("risk analysis failed")?;
    info!(
        "Portfolio risk: {:.2} ({})",
        analysis.total_risk_score, analysis.risk_level
    );
    println!("{}", serde_json::to_string_pretty(&analysis)?);

    let plan = advisor::suggest(&positions, &catalog).context("rebalance suggestions failed")?;
    if plan.suggestions.is_empty() {
        info!("No rebalancing suggestions");
    } else {
        for suggestion in &plan.suggestions {
            info!("Suggestion: {}", suggestion);
        }
        info!(
            "Target risk: {:.2}, target yield: {:.2}%",
            plan.target_risk, plan.target_yield
        );
    }
    println!("{}", serde_json::to_string_pretty(&plan)?);

    match optimizer::generate_optimized_portfolio(
        config.risk_profile,
        &catalog,
        &config.preferences,
        &config.market,
    ) {
        Ok(optimized) => {
            info!(
                "Optimized portfolio: {} protocols, expected return {:.2}%",
                optimized.allocations.len(),
                optimized.expected_annual_return
            );
            println!("{}", serde_json::to_string_pretty(&optimized)?);
        }
        Err(e) => warn!("Skipping optimization: {}", e),
    }

    let outcomes = scenarios::simulate_market_scenarios(&positions, &catalog)
        .context("scenario simulation failed")?;
    info!(
        "Scenario returns: baseline {:.2}%, bull {:.2}%, bear {:.2}%",
        outcomes.baseline.annualized_return,
        outcomes.bull_market.annualized_return,
        outcomes.bear_market.annualized_return
    );
    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {path}"))
}
