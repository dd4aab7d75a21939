use crate::error::Result;
use crate::portfolio::{Position, round2, total_allocation, validate_positions};
use crate::protocol::{DEFAULT_RISK_SCORE, ProtocolCatalog, ProtocolInfo};
use serde::{Deserialize, Serialize};

/// Risk impact at or above which a position gets a reduce suggestion
const RISK_IMPACT_THRESHOLD: f64 = 5.0;
/// Largest single reallocation step, in percentage points
const MAX_SHIFT: f64 = 10.0;
/// A candidate already holding this much of the portfolio is not increased
const MAX_HELD_ALLOCATION: f64 = 50.0;

/// Human-readable rebalancing suggestions plus projected risk/yield
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebalancePlan {
    pub suggestions: Vec<String>,
    pub target_risk: f64,
    pub target_yield: f64,
}

impl RebalancePlan {
    fn empty() -> Self {
        Self {
            suggestions: vec![],
            target_risk: 0.0,
            target_yield: 0.0,
        }
    }
}

/// Greedy single-pass reallocation heuristic
///
/// First pass: every held position whose risk impact (10 - risk score) is at
/// least 5 gets a reduce suggestion of up to 10 points, and the freed
/// capacity is tracked. Second pass: the full catalog is scanned in insertion
/// order for the single best protocol to increase, scored by `apy - risk
/// impact` with strict-greater comparison so the first-seen candidate wins
/// ties. The APY eligibility gate divides current yield by the pre-reduction
/// total percentage; that denominator is part of the observable contract and
/// is kept as-is.
///
/// Unknown protocols fall back to `{risk_score: 5, apy: 0}`. Projected risk
/// and yield use the unnormalized composite of [`crate::scoring::score`] and
/// are rounded to 2 decimals.
pub fn suggest(positions: &[Position], catalog: &ProtocolCatalog) -> Result<RebalancePlan> {
    validate_positions(positions)?;

    let total_percentage = total_allocation(positions);
    if total_percentage == 0.0 {
        return Ok(RebalancePlan::empty());
    }

    let mut current_risk = 0.0;
    let mut current_yield = 0.0;
    for position in positions {
        let (risk_score, apy) = lookup(catalog, &position.protocol);
        current_risk += (10.0 - risk_score) * (position.allocation / 100.0);
        current_yield += apy * (position.allocation / 100.0);
    }

    let mut suggestions = Vec::new();
    let mut target_risk = current_risk;
    let mut target_yield = current_yield;
    let mut freed_capacity = 0.0;

    for position in positions {
        let (risk_score, apy) = lookup(catalog, &position.protocol);
        let risk_impact = 10.0 - risk_score;
        if risk_impact >= RISK_IMPACT_THRESHOLD && position.allocation > 0.0 {
            let reduction = position.allocation.min(MAX_SHIFT);
            suggestions.push(format!(
                "Reduce {} by {}% (Risk: {}/10)",
                position.protocol, reduction, risk_impact
            ));
            target_risk -= risk_impact * (reduction / 100.0);
            target_yield -= apy * (reduction / 100.0);
            freed_capacity += reduction;
        }
    }

    if let Some(candidate) = best_increase_candidate(
        positions,
        catalog,
        current_yield / total_percentage,
        freed_capacity,
    ) {
        let increase = MAX_SHIFT.min(freed_capacity);
        let risk_impact = 10.0 - f64::from(candidate.risk_score);
        suggestions.push(format!(
            "Increase {} by {}% (APY: {}%)",
            candidate.name, increase, candidate.apy
        ));
        target_risk += risk_impact * (increase / 100.0);
        target_yield += candidate.apy * (increase / 100.0);
    }

    Ok(RebalancePlan {
        suggestions,
        target_risk: round2(target_risk),
        target_yield: round2(target_yield),
    })
}

/// Scan the whole catalog (not just held positions) for the single best
/// protocol to increase; insertion order decides ties
fn best_increase_candidate<'a>(
    positions: &[Position],
    catalog: &'a ProtocolCatalog,
    yield_per_point: f64,
    freed_capacity: f64,
) -> Option<&'a ProtocolInfo> {
    let mut best: Option<(&ProtocolInfo, f64)> = None;

    for candidate in catalog.iter() {
        let risk_impact = 10.0 - f64::from(candidate.risk_score);
        let held = held_allocation(positions, catalog, candidate);
        let eligible = candidate.apy > yield_per_point
            && risk_impact < RISK_IMPACT_THRESHOLD
            && held < MAX_HELD_ALLOCATION
            && freed_capacity > 0.0;
        if !eligible {
            continue;
        }

        let score = candidate.apy - risk_impact;
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    best.map(|(candidate, _)| candidate)
}

/// Total allocation the portfolio already assigns to this catalog entry
fn held_allocation(
    positions: &[Position],
    catalog: &ProtocolCatalog,
    candidate: &ProtocolInfo,
) -> f64 {
    positions
        .iter()
        .filter(|position| {
            catalog
                .resolve(&position.protocol)
                .is_some_and(|p| p.id == candidate.id)
        })
        .map(|position| position.allocation)
        .sum()
}

fn lookup(catalog: &ProtocolCatalog, protocol_ref: &str) -> (f64, f64) {
    catalog
        .resolve(protocol_ref)
        .map(|p| (f64::from(p.risk_score), p.apy))
        .unwrap_or((f64::from(DEFAULT_RISK_SCORE), 0.0))
}
