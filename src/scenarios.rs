use crate::error::{EngineError, Result};
use crate::portfolio::{Position, validate_positions};
use crate::protocol::{ProtocolCatalog, ProtocolInfo};
use serde::{Deserialize, Serialize};

/// APY multipliers for the market-wide scenarios
const BASELINE_MULTIPLIER: f64 = 1.0;
const BULL_MULTIPLIER: f64 = 1.5;
const BEAR_MULTIPLIER: f64 = 0.6;
/// Allocation-weighted impact of a hack on the riskiest held position
const HACK_IMPACT: f64 = -0.8;
/// Fixed portfolio-wide impact of a liquidity crisis
const LIQUIDITY_CRISIS_IMPACT: f64 = -0.3;

/// Allocation-weighted annualized return under one APY multiplier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioPerformance {
    pub annualized_return: f64,
    pub scenario: String,
}

/// Projected fallout of the riskiest held protocol being exploited
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HackScenario {
    pub scenario: String,
    pub impacted_protocol: String,
    pub portfolio_impact: f64,
    pub recommended_action: String,
}

/// Stub-level liquidity-crisis model: fixed impact, static category list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityCrisisScenario {
    pub scenario: String,
    pub portfolio_impact: f64,
    pub worst_affected_categories: Vec<String>,
    pub recommended_action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcomes {
    pub baseline: ScenarioPerformance,
    pub bull_market: ScenarioPerformance,
    pub bear_market: ScenarioPerformance,
    pub protocol_hack: HackScenario,
    pub liquidity_crisis: LiquidityCrisisScenario,
}

/// Project bull/bear/hack/liquidity-crisis outcomes for a portfolio
///
/// Every position must resolve against the catalog; the scenario models are
/// fixed multipliers and shocks, not market simulations.
pub fn simulate_market_scenarios(
    positions: &[Position],
    catalog: &ProtocolCatalog,
) -> Result<ScenarioOutcomes> {
    if positions.is_empty() {
        return Err(EngineError::InvalidInput("portfolio is empty".to_string()));
    }
    validate_positions(positions)?;

    Ok(ScenarioOutcomes {
        baseline: performance(positions, catalog, "baseline", BASELINE_MULTIPLIER)?,
        bull_market: performance(positions, catalog, "bull", BULL_MULTIPLIER)?,
        bear_market: performance(positions, catalog, "bear", BEAR_MULTIPLIER)?,
        protocol_hack: simulate_protocol_hack(positions, catalog)?,
        liquidity_crisis: simulate_liquidity_crisis(),
    })
}

fn performance(
    positions: &[Position],
    catalog: &ProtocolCatalog,
    scenario: &str,
    multiplier: f64,
) -> Result<ScenarioPerformance> {
    let mut total_return = 0.0;
    for position in positions {
        let protocol = resolve(catalog, position)?;
        total_return += position.allocation * (protocol.apy * multiplier) / 100.0;
    }
    Ok(ScenarioPerformance {
        annualized_return: total_return,
        scenario: scenario.to_string(),
    })
}

/// Apply a fixed -80% shock to the single riskiest held position
fn simulate_protocol_hack(
    positions: &[Position],
    catalog: &ProtocolCatalog,
) -> Result<HackScenario> {
    let mut riskiest: Option<(&Position, &ProtocolInfo)> = None;
    for position in positions {
        let protocol = resolve(catalog, position)?;
        if riskiest.is_none_or(|(_, current)| protocol.risk_score > current.risk_score) {
            riskiest = Some((position, protocol));
        }
    }

    let Some((position, protocol)) = riskiest else {
        return Err(EngineError::InvalidInput("portfolio is empty".to_string()));
    };
    Ok(HackScenario {
        scenario: "protocol hack".to_string(),
        impacted_protocol: protocol.id.clone(),
        portfolio_impact: position.allocation * HACK_IMPACT,
        recommended_action: "Diversify away from high-risk protocols".to_string(),
    })
}

fn simulate_liquidity_crisis() -> LiquidityCrisisScenario {
    LiquidityCrisisScenario {
        scenario: "liquidity crisis".to_string(),
        portfolio_impact: LIQUIDITY_CRISIS_IMPACT,
        worst_affected_categories: vec!["dex".to_string(), "lending".to_string()],
        recommended_action: "Increase allocation to protocols with deep liquidity".to_string(),
    }
}

fn resolve<'a>(catalog: &'a ProtocolCatalog, position: &Position) -> Result<&'a ProtocolInfo> {
    catalog.resolve(&position.protocol).ok_or_else(|| {
        EngineError::InsufficientData(format!(
            "protocol '{}' is not in the catalog",
            position.protocol
        ))
    })
}
