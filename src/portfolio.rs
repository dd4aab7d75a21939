use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// One portfolio position: a protocol reference plus its share of the
/// total portfolio value, in percent
///
/// A portfolio is an ordered `Vec<Position>`. Totals are conventionally
/// <= 100 but callers may submit anything; each computation states whether
/// it normalizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Protocol id or free-form name, resolved against the catalog
    pub protocol: String,
    /// Percent of total portfolio value, 0-100
    pub allocation: f64,
}

impl Position {
    pub fn new(protocol: impl Into<String>, allocation: f64) -> Self {
        Self {
            protocol: protocol.into(),
            allocation,
        }
    }
}

/// Reject non-finite or negative allocations before any arithmetic runs
pub fn validate_positions(positions: &[Position]) -> Result<()> {
    for position in positions {
        if !position.allocation.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "allocation for '{}' is not a finite number",
                position.protocol
            )));
        }
        if position.allocation < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "allocation for '{}' is negative",
                position.protocol
            )));
        }
    }
    Ok(())
}

pub fn total_allocation(positions: &[Position]) -> f64 {
    positions.iter().map(|p| p.allocation).sum()
}

/// Round to 2 decimals, the precision every percent-valued output carries
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Caller risk appetite, mapped to a numeric tolerance for the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Low,
    Medium,
    High,
}

impl RiskProfile {
    /// Numeric risk tolerance: 3 / 5 / 8
    pub fn tolerance_score(self) -> f64 {
        match self {
            RiskProfile::Low => 3.0,
            RiskProfile::Medium => 5.0,
            RiskProfile::High => 8.0,
        }
    }
}

impl std::str::FromStr for RiskProfile {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskProfile::Low),
            "medium" => Ok(RiskProfile::Medium),
            "high" => Ok(RiskProfile::High),
            other => Err(EngineError::InvalidInput(format!(
                "unknown risk profile '{other}'"
            ))),
        }
    }
}

/// Externally supplied macro market snapshot
///
/// Only `risk_score` feeds the analysis (as the systemic-risk factor); the
/// remaining fields are carried along for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCondition {
    #[serde(default = "default_market_risk_score")]
    pub risk_score: f64,
    #[serde(default = "default_fear_greed_index")]
    pub fear_greed_index: f64,
    #[serde(default = "default_volatility_index")]
    pub volatility_index: f64,
    #[serde(default = "default_trend_direction")]
    pub trend_direction: String,
}

impl Default for MarketCondition {
    fn default() -> Self {
        Self {
            risk_score: default_market_risk_score(),
            fear_greed_index: default_fear_greed_index(),
            volatility_index: default_volatility_index(),
            trend_direction: default_trend_direction(),
        }
    }
}

fn default_market_risk_score() -> f64 {
    5.0
}

fn default_fear_greed_index() -> f64 {
    45.0
}

fn default_volatility_index() -> f64 {
    60.0
}

fn default_trend_direction() -> String {
    "neutral".to_string()
}

/// Per-user rebalancing preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: f64,
    #[serde(default)]
    pub excluded_protocols: Vec<String>,
    #[serde(default)]
    pub preferred_chains: Vec<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            risk_threshold: default_risk_threshold(),
            excluded_protocols: vec![],
            preferred_chains: vec![],
        }
    }
}

fn default_risk_threshold() -> f64 {
    7.0
}

impl UserPreferences {
    pub fn excludes(&self, name: &str) -> bool {
        let needle = name.trim().to_lowercase();
        self.excluded_protocols
            .iter()
            .any(|excluded| excluded.trim().to_lowercase() == needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_rejects_nan_allocation() {
        let positions = vec![Position::new("aave", f64::NAN)];
        assert!(matches!(
            validate_positions(&positions),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_negative_allocation() {
        let positions = vec![Position::new("aave", -5.0)];
        assert!(validate_positions(&positions).is_err());
    }

    #[test]
    fn test_risk_profile_parsing() {
        assert_eq!(RiskProfile::from_str("low").unwrap(), RiskProfile::Low);
        assert_eq!(RiskProfile::from_str(" High ").unwrap(), RiskProfile::High);
        assert!(RiskProfile::from_str("reckless").is_err());
    }

    #[test]
    fn test_tolerance_scores() {
        assert_eq!(RiskProfile::Low.tolerance_score(), 3.0);
        assert_eq!(RiskProfile::Medium.tolerance_score(), 5.0);
        assert_eq!(RiskProfile::High.tolerance_score(), 8.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(33.3333333), 33.33);
        assert_eq!(round2(66.6666666), 66.67);
    }

    #[test]
    fn test_preferences_exclusion_is_case_insensitive() {
        let prefs = UserPreferences {
            excluded_protocols: vec!["Aave".to_string()],
            ..Default::default()
        };
        assert!(prefs.excludes("aave "));
        assert!(!prefs.excludes("compound"));
    }
}
