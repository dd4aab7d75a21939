use crate::concentration::{chain_diversification, concentration_risk};
use crate::error::{EngineError, Result};
use crate::portfolio::{MarketCondition, Position, total_allocation, validate_positions};
use crate::protocol::ProtocolCatalog;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Factor weights of the composite score
const PROTOCOL_RISK_WEIGHT: f64 = 0.3;
const CHAIN_DIVERSIFICATION_WEIGHT: f64 = 0.2;
const CONCENTRATION_WEIGHT: f64 = 0.2;
const IMPERMANENT_LOSS_WEIGHT: f64 = 0.1;
const SYSTEMIC_WEIGHT: f64 = 0.2;

/// Qualitative bucket for a composite risk score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "very low")]
    VeryLow,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "very high")]
    VeryHigh,
}

impl RiskLevel {
    /// Threshold mapping, half-open on the low end:
    /// <3 very low, <5 low, <7 medium, <8.5 high, else very high
    pub fn from_score(score: f64) -> Self {
        if score < 3.0 {
            RiskLevel::VeryLow
        } else if score < 5.0 {
            RiskLevel::Low
        } else if score < 7.0 {
            RiskLevel::Medium
        } else if score < 8.5 {
            RiskLevel::High
        } else {
            RiskLevel::VeryHigh
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::VeryLow => "very low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "very high",
        };
        write!(f, "{label}")
    }
}

/// Individual factor scores feeding the weighted composite
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactors {
    pub protocol_risk: f64,
    pub chain_diversification: f64,
    pub concentration_risk: f64,
    pub impermanent_loss_risk: f64,
    pub systemic_risk: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysisResult {
    pub total_risk_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: RiskFactors,
}

/// Multi-factor weighted portfolio risk analysis
///
/// Composite = 0.3 * protocol risk + 0.2 * chain diversification +
/// 0.2 * concentration + 0.1 * impermanent loss + 0.2 * systemic risk.
/// All factor ratios divide by the total (or resolved) allocation, so both
/// an empty portfolio and a zero total are defined failures. Systemic risk
/// comes from the injected market snapshot; it is never computed here.
pub fn evaluate_portfolio_risk(
    positions: &[Position],
    catalog: &ProtocolCatalog,
    market: &MarketCondition,
) -> Result<RiskAnalysisResult> {
    if positions.is_empty() {
        return Err(EngineError::InvalidInput("portfolio is empty".to_string()));
    }
    validate_positions(positions)?;
    if total_allocation(positions) == 0.0 {
        return Err(EngineError::ZeroAllocation);
    }

    let risk_factors = RiskFactors {
        protocol_risk: protocol_risk(positions, catalog)?,
        chain_diversification: chain_diversification(positions, catalog)?,
        concentration_risk: concentration_risk(positions)?,
        impermanent_loss_risk: impermanent_loss_risk(positions, catalog),
        systemic_risk: market.risk_score,
    };

    let total_risk_score = PROTOCOL_RISK_WEIGHT * risk_factors.protocol_risk
        + CHAIN_DIVERSIFICATION_WEIGHT * risk_factors.chain_diversification
        + CONCENTRATION_WEIGHT * risk_factors.concentration_risk
        + IMPERMANENT_LOSS_WEIGHT * risk_factors.impermanent_loss_risk
        + SYSTEMIC_WEIGHT * risk_factors.systemic_risk;

    Ok(RiskAnalysisResult {
        total_risk_score,
        risk_level: RiskLevel::from_score(total_risk_score),
        risk_factors,
    })
}

/// Allocation-weighted average risk score over catalog-resolved positions
///
/// Positions that do not resolve are skipped from both numerator and
/// denominator; if nothing resolves there is no average to take.
fn protocol_risk(positions: &[Position], catalog: &ProtocolCatalog) -> Result<f64> {
    let mut weighted_risk = 0.0;
    let mut resolved_weight = 0.0;

    for position in positions {
        if let Some(protocol) = catalog.resolve(&position.protocol) {
            weighted_risk += f64::from(protocol.risk_score) * position.allocation;
            resolved_weight += position.allocation;
        }
    }

    if resolved_weight == 0.0 {
        return Err(EngineError::InsufficientData(
            "no portfolio position matches the catalog".to_string(),
        ));
    }
    Ok(weighted_risk / resolved_weight)
}

/// Impermanent-loss exposure: dex and yield-farming positions weigh 0.8,
/// everything else (including unresolved positions) 0.2
fn impermanent_loss_risk(positions: &[Position], catalog: &ProtocolCatalog) -> f64 {
    let total = total_allocation(positions);
    let exposure: f64 = positions
        .iter()
        .map(|position| {
            let factor = match catalog.resolve(&position.protocol) {
                Some(protocol)
                    if matches!(
                        protocol.category.to_lowercase().as_str(),
                        "dex" | "yield farming"
                    ) =>
                {
                    0.8
                }
                _ => 0.2,
            };
            position.allocation * factor
        })
        .sum();
    exposure / total
}
