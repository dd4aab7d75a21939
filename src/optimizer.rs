use crate::error::{EngineError, Result};
use crate::portfolio::{
    MarketCondition, Position, RiskProfile, UserPreferences, round2, total_allocation,
    validate_positions,
};
use crate::protocol::{ProtocolCatalog, ProtocolInfo};
use crate::risk::{RiskAnalysisResult, evaluate_portfolio_risk};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Bounds on how many protocols an optimized portfolio holds
const MIN_SELECTED: usize = 3;
const MAX_SELECTED: usize = 8;

/// Existing allocations shrink to this share when higher-yield protocols
/// are blended in
const BLEND_REDUCTION_FACTOR: f64 = 0.8;
/// At most this many new protocols are blended into an existing portfolio
const MAX_BLENDED_PROTOCOLS: usize = 3;
/// Blend candidates may carry up to 1.1x the portfolio's current risk
const BLEND_RISK_HEADROOM: f64 = 1.1;

/// One target allocation in an optimized portfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// Catalog id of the selected protocol
    pub protocol: String,
    /// Percent of the portfolio, weights sum to 100
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub allocations: Vec<Allocation>,
    pub risk_analysis: RiskAnalysisResult,
    pub expected_annual_return: f64,
    pub diversification_score: f64,
}

/// Build a target allocation from a risk-tolerance profile
///
/// Candidates are filtered by exclusion list and (when given) preferred
/// chains, ranked by the Sharpe-like ratio `apy / risk_score`, and the top
/// `clamp(round(tolerance), 3, 8)` survive. Each selected protocol is then
/// weighted by its risk-adjusted return `apy / risk_score^(2 - tolerance/10)`
/// and the weights are normalized twice before 2-decimal rounding; the double
/// normalization is part of the observable contract and preserved as-is.
///
/// An empty candidate set after filtering is an explicit failure, never a
/// zero division.
pub fn generate_optimized_portfolio(
    risk_profile: RiskProfile,
    catalog: &ProtocolCatalog,
    preferences: &UserPreferences,
    market: &MarketCondition,
) -> Result<OptimizationResult> {
    let tolerance = risk_profile.tolerance_score();

    let mut candidates: Vec<&ProtocolInfo> = catalog
        .iter()
        .filter(|p| !preferences.excludes(&p.name))
        .filter(|p| {
            preferences.preferred_chains.is_empty()
                || preferences
                    .preferred_chains
                    .iter()
                    .any(|chain| chain.eq_ignore_ascii_case(&p.blockchain))
        })
        .collect();

    if candidates.is_empty() {
        return Err(EngineError::InsufficientData(
            "no eligible protocols after filtering".to_string(),
        ));
    }

    candidates.sort_by(|a, b| {
        let sharpe_a = a.apy / f64::from(a.risk_score);
        let sharpe_b = b.apy / f64::from(b.risk_score);
        sharpe_b
            .partial_cmp(&sharpe_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let count = (tolerance.round() as usize).clamp(MIN_SELECTED, MAX_SELECTED);
    let selected = &candidates[..count.min(candidates.len())];

    let risk_adjusted_returns: Vec<f64> = selected
        .iter()
        .map(|p| p.apy / f64::from(p.risk_score).powf(2.0 - tolerance / 10.0))
        .collect();
    let total_risk_adjusted: f64 = risk_adjusted_returns.iter().sum();
    if total_risk_adjusted == 0.0 {
        return Err(EngineError::InsufficientData(
            "selected protocols have zero risk-adjusted return".to_string(),
        ));
    }

    let raw_weights: Vec<f64> = risk_adjusted_returns
        .iter()
        .map(|rar| rar / total_risk_adjusted * 100.0)
        .collect();
    let total_weight: f64 = raw_weights.iter().sum();

    let allocations: Vec<Allocation> = selected
        .iter()
        .zip(&raw_weights)
        .map(|(protocol, weight)| Allocation {
            protocol: protocol.id.clone(),
            weight: round2(weight / total_weight * 100.0),
        })
        .collect();

    let positions: Vec<Position> = allocations
        .iter()
        .map(|a| Position::new(a.protocol.clone(), a.weight))
        .collect();
    let risk_analysis = evaluate_portfolio_risk(&positions, catalog, market)?;

    let expected_annual_return = selected
        .iter()
        .zip(&allocations)
        .map(|(protocol, allocation)| protocol.apy * allocation.weight / 100.0)
        .sum();
    let diversification_score = 10.0 - risk_analysis.risk_factors.concentration_risk;

    Ok(OptimizationResult {
        allocations,
        risk_analysis,
        expected_annual_return,
        diversification_score,
    })
}

/// Rework an existing portfolio against the caller's risk threshold
///
/// Positions held in protocols riskier than the threshold are swapped onto
/// the best same-category alternative below the threshold, or their
/// allocation is redistributed proportionally when no alternative exists.
/// A portfolio with nothing over the threshold instead gets up to 3
/// higher-yield protocols (within 1.1x its current weighted risk) blended
/// in by shrinking existing allocations 20%. Every return path re-normalizes
/// allocations to sum to exactly 100 with 2-decimal rounding.
pub fn rebalance_portfolio(
    current: &[Position],
    catalog: &ProtocolCatalog,
    preferences: &UserPreferences,
) -> Result<Vec<Position>> {
    if current.is_empty() {
        return Err(EngineError::InvalidInput("portfolio is empty".to_string()));
    }
    validate_positions(current)?;

    let held = held_protocols(current, catalog);
    if held.is_empty() {
        return Err(EngineError::InsufficientData(
            "no portfolio position matches the catalog".to_string(),
        ));
    }

    let risky: Vec<&ProtocolInfo> = held
        .iter()
        .copied()
        .filter(|p| f64::from(p.risk_score) > preferences.risk_threshold)
        .collect();

    if !risky.is_empty() {
        let alternatives = safer_alternatives(catalog, &risky, preferences);
        return swap_risky_positions(current, catalog, &risky, &alternatives);
    }

    blend_in_high_yield(current, catalog, &held, preferences)
}

/// Unique catalog entries the portfolio currently holds, in position order
fn held_protocols<'a>(
    positions: &[Position],
    catalog: &'a ProtocolCatalog,
) -> Vec<&'a ProtocolInfo> {
    let mut held: Vec<&ProtocolInfo> = Vec::new();
    for position in positions {
        if let Some(protocol) = catalog.resolve(&position.protocol) {
            if !held.iter().any(|p| p.id == protocol.id) {
                held.push(protocol);
            }
        }
    }
    held
}

/// Same-category candidates below the risk threshold, best APY first,
/// capped at twice the number of risky positions
fn safer_alternatives<'a>(
    catalog: &'a ProtocolCatalog,
    risky: &[&ProtocolInfo],
    preferences: &UserPreferences,
) -> Vec<&'a ProtocolInfo> {
    let mut alternatives: Vec<&ProtocolInfo> = catalog
        .iter()
        .filter(|p| risky.iter().any(|r| r.category == p.category))
        .filter(|p| f64::from(p.risk_score) < preferences.risk_threshold)
        .filter(|p| !preferences.excludes(&p.name))
        .collect();
    alternatives.sort_by(|a, b| b.apy.partial_cmp(&a.apy).unwrap_or(std::cmp::Ordering::Equal));
    alternatives.truncate(risky.len() * 2);
    alternatives
}

fn swap_risky_positions(
    current: &[Position],
    catalog: &ProtocolCatalog,
    risky: &[&ProtocolInfo],
    alternatives: &[&ProtocolInfo],
) -> Result<Vec<Position>> {
    let mut portfolio = current.to_vec();

    for risky_protocol in risky {
        let Some(index) = portfolio.iter().position(|position| {
            catalog
                .resolve(&position.protocol)
                .is_some_and(|p| p.id == risky_protocol.id)
        }) else {
            continue;
        };
        let allocation = portfolio.remove(index).allocation;

        match alternatives
            .iter()
            .find(|a| a.category == risky_protocol.category)
        {
            Some(alternative) => {
                portfolio.push(Position::new(alternative.id.clone(), allocation));
            }
            None => {
                // Spread the freed allocation proportionally across what remains
                let remaining_total = total_allocation(&portfolio);
                if remaining_total == 0.0 {
                    return Err(EngineError::ZeroAllocation);
                }
                for position in &mut portfolio {
                    position.allocation += allocation * position.allocation / remaining_total;
                }
            }
        }
    }

    normalize(portfolio)
}

fn blend_in_high_yield(
    current: &[Position],
    catalog: &ProtocolCatalog,
    held: &[&ProtocolInfo],
    preferences: &UserPreferences,
) -> Result<Vec<Position>> {
    let current_risk = weighted_risk(current, catalog)?;
    let average_apy = held.iter().map(|p| p.apy).collect::<Vec<f64>>().mean();

    let mut candidates: Vec<&ProtocolInfo> = catalog
        .iter()
        .filter(|p| f64::from(p.risk_score) <= current_risk * BLEND_RISK_HEADROOM)
        .filter(|p| p.apy > average_apy)
        .filter(|p| !preferences.excludes(&p.name))
        .collect();
    candidates.sort_by(|a, b| b.apy.partial_cmp(&a.apy).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(MAX_BLENDED_PROTOCOLS);

    if candidates.is_empty() {
        return normalize(current.to_vec());
    }

    let mut portfolio = current.to_vec();
    for position in &mut portfolio {
        position.allocation *= BLEND_REDUCTION_FACTOR;
    }
    let available = 100.0 - total_allocation(&portfolio);
    let per_protocol = available / candidates.len() as f64;
    for candidate in candidates {
        portfolio.push(Position::new(candidate.id.clone(), per_protocol));
    }

    normalize(portfolio)
}

/// Allocation-weighted risk over catalog-resolved positions
fn weighted_risk(positions: &[Position], catalog: &ProtocolCatalog) -> Result<f64> {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for position in positions {
        if let Some(protocol) = catalog.resolve(&position.protocol) {
            weighted += f64::from(protocol.risk_score) * position.allocation;
            total_weight += position.allocation;
        }
    }
    if total_weight == 0.0 {
        return Err(EngineError::ZeroAllocation);
    }
    Ok(weighted / total_weight)
}

/// Re-scale allocations to sum to exactly 100, rounded to 2 decimals
fn normalize(mut portfolio: Vec<Position>) -> Result<Vec<Position>> {
    let total = total_allocation(&portfolio);
    if total == 0.0 {
        return Err(EngineError::ZeroAllocation);
    }
    for position in &mut portfolio {
        position.allocation = round2(position.allocation / total * 100.0);
    }
    Ok(portfolio)
}
