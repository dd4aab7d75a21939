use crate::portfolio::{MarketCondition, RiskProfile, UserPreferences};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

/// Analyzer run configuration
///
/// Points at the catalog and portfolio snapshot files and carries the
/// injected market condition plus user preferences. Every field has a
/// default so a missing config file still produces a runnable setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
    #[serde(default = "default_portfolio_file")]
    pub portfolio_file: String,
    #[serde(default = "default_risk_profile")]
    pub risk_profile: RiskProfile,
    #[serde(default)]
    pub market: MarketCondition,
    #[serde(default)]
    pub preferences: UserPreferences,
}

fn default_catalog_file() -> String {
    "catalog.json".to_string()
}

fn default_portfolio_file() -> String {
    "portfolio.json".to_string()
}

fn default_risk_profile() -> RiskProfile {
    RiskProfile::Medium
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_file: default_catalog_file(),
            portfolio_file: default_portfolio_file(),
            risk_profile: default_risk_profile(),
            market: MarketCondition::default(),
            preferences: UserPreferences::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_file("config.json")
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let config_str = fs::read_to_string(path).unwrap_or_else(|_| Self::default_config_json());
        let config: AppConfig = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    fn default_config_json() -> String {
        serde_json::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/config.json").unwrap();
        assert_eq!(config.catalog_file, "catalog.json");
        assert_eq!(config.risk_profile, RiskProfile::Medium);
        assert_eq!(config.market.risk_score, 5.0);
    }

    #[test]
    fn test_partial_config_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"riskProfile": "high", "market": {"riskScore": 7.5}}"#)
                .unwrap();
        assert_eq!(config.risk_profile, RiskProfile::High);
        assert_eq!(config.market.risk_score, 7.5);
        assert_eq!(config.market.trend_direction, "neutral");
        assert_eq!(config.portfolio_file, "portfolio.json");
    }
}
