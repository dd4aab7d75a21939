use defi_portfolio::optimizer::{generate_optimized_portfolio, rebalance_portfolio};
use defi_portfolio::portfolio::{MarketCondition, Position, RiskProfile, UserPreferences};
use defi_portfolio::protocol::{ProtocolCatalog, ProtocolInfo};
use defi_portfolio::risk::evaluate_portfolio_risk;
use defi_portfolio::EngineError;
use proptest::prelude::*;

fn protocol(id: &str, chain: &str, category: &str, risk: u8, apy: f64) -> ProtocolInfo {
    ProtocolInfo {
        id: id.to_string(),
        name: id.to_string(),
        blockchain: chain.to_string(),
        category: category.to_string(),
        tvl: 1e9,
        apy,
        risk_score: risk,
        audited: true,
    }
}

fn ten_protocol_catalog() -> ProtocolCatalog {
    vec![
        protocol("aave", "ethereum", "lending", 3, 5.0),
        protocol("compound", "ethereum", "lending", 4, 6.0),
        protocol("uniswap", "ethereum", "dex", 5, 12.0),
        protocol("curve", "ethereum", "dex", 4, 8.0),
        protocol("raydium", "solana", "yield farming", 7, 20.0),
        protocol("orca", "solana", "dex", 5, 9.0),
        protocol("gmx", "arbitrum", "derivatives", 6, 15.0),
        protocol("lido", "ethereum", "staking", 3, 4.0),
        protocol("pendle", "ethereum", "yield farming", 6, 18.0),
        protocol("morpho", "ethereum", "lending", 4, 7.0),
    ]
    .into()
}

#[test]
fn test_low_profile_selects_exactly_three_of_ten() {
    let result = generate_optimized_portfolio(
        RiskProfile::Low,
        &ten_protocol_catalog(),
        &UserPreferences::default(),
        &MarketCondition::default(),
    )
    .unwrap();
    assert_eq!(result.allocations.len(), 3);
}

#[test]
fn test_profile_tolerance_controls_selection_count() {
    let catalog = ten_protocol_catalog();
    for (profile, expected) in [
        (RiskProfile::Low, 3),
        (RiskProfile::Medium, 5),
        (RiskProfile::High, 8),
    ] {
        let result = generate_optimized_portfolio(
            profile,
            &catalog,
            &UserPreferences::default(),
            &MarketCondition::default(),
        )
        .unwrap();
        assert_eq!(result.allocations.len(), expected, "{profile:?}");
    }
}

#[test]
fn test_empty_candidate_set_is_an_explicit_failure() {
    let result = generate_optimized_portfolio(
        RiskProfile::Medium,
        &ProtocolCatalog::new(),
        &UserPreferences::default(),
        &MarketCondition::default(),
    );
    assert!(matches!(result, Err(EngineError::InsufficientData(_))));
}

#[test]
fn test_diversification_score_complements_concentration() {
    let result = generate_optimized_portfolio(
        RiskProfile::Medium,
        &ten_protocol_catalog(),
        &UserPreferences::default(),
        &MarketCondition::default(),
    )
    .unwrap();
    let expected = 10.0 - result.risk_analysis.risk_factors.concentration_risk;
    assert!((result.diversification_score - expected).abs() < 1e-9);
}

#[test]
fn test_expected_return_matches_weighted_apys() {
    let catalog = ten_protocol_catalog();
    let result = generate_optimized_portfolio(
        RiskProfile::Medium,
        &catalog,
        &UserPreferences::default(),
        &MarketCondition::default(),
    )
    .unwrap();

    let recomputed: f64 = result
        .allocations
        .iter()
        .map(|a| catalog.get_by_id(&a.protocol).unwrap().apy * a.weight / 100.0)
        .sum();
    assert!((result.expected_annual_return - recomputed).abs() < 1e-9);
}

#[test]
fn test_round_trip_concentration_is_consistent() {
    let catalog = ten_protocol_catalog();
    let result = generate_optimized_portfolio(
        RiskProfile::Medium,
        &catalog,
        &UserPreferences::default(),
        &MarketCondition::default(),
    )
    .unwrap();

    let positions: Vec<Position> = result
        .allocations
        .iter()
        .map(|a| Position::new(a.protocol.clone(), a.weight))
        .collect();
    let analysis =
        evaluate_portfolio_risk(&positions, &catalog, &MarketCondition::default()).unwrap();

    // Concentration recomputed from the returned weights must agree with
    // the analysis bundled in the optimizer result
    let total: f64 = result.allocations.iter().map(|a| a.weight).sum();
    let hhi: f64 = result
        .allocations
        .iter()
        .map(|a| (a.weight / total).powi(2))
        .sum();
    let expected = 1.0 + 9.0 * hhi;
    assert!((analysis.risk_factors.concentration_risk - expected).abs() < 1e-6);

    // And it must be bounded by the equal-weight ideal for that many holdings
    let n = result.allocations.len() as f64;
    assert!(analysis.risk_factors.concentration_risk >= 1.0 + 9.0 / n - 1e-6);
    assert!(analysis.risk_factors.concentration_risk <= 10.0);
}

#[test]
fn test_rebalance_normalizes_to_one_hundred() {
    let catalog = ten_protocol_catalog();
    let preferences = UserPreferences {
        risk_threshold: 6.5,
        ..Default::default()
    };
    // raydium (risk 7) breaches the threshold; pendle is the best
    // yield-farming alternative below it
    let positions = vec![
        Position::new("aave", 40.0),
        Position::new("raydium", 35.0),
        Position::new("uniswap", 25.0),
    ];
    let rebalanced = rebalance_portfolio(&positions, &catalog, &preferences).unwrap();

    let total: f64 = rebalanced.iter().map(|p| p.allocation).sum();
    assert!((total - 100.0).abs() < 0.05);
    assert!(rebalanced.iter().all(|p| p.protocol != "raydium"));
    assert!(rebalanced.iter().any(|p| p.protocol == "pendle"));
}

proptest! {
    #[test]
    fn prop_optimizer_weights_sum_to_one_hundred(
        specs in prop::collection::vec((1u8..=10, 0.5f64..30.0), 3..20),
        profile_idx in 0usize..3,
    ) {
        let catalog: ProtocolCatalog = specs
            .iter()
            .enumerate()
            .map(|(i, &(risk, apy))| protocol(&format!("p{i}"), "ethereum", "lending", risk, apy))
            .collect();
        let profile = [RiskProfile::Low, RiskProfile::Medium, RiskProfile::High][profile_idx];

        let result = generate_optimized_portfolio(
            profile,
            &catalog,
            &UserPreferences::default(),
            &MarketCondition::default(),
        )
        .unwrap();

        let total: f64 = result.allocations.iter().map(|a| a.weight).sum();
        prop_assert!((total - 100.0).abs() < 0.05, "weights sum to {}", total);
        prop_assert!(result.allocations.iter().all(|a| a.weight >= 0.0));

        let expected_count = (profile.tolerance_score().round() as usize)
            .clamp(3, 8)
            .min(catalog.len());
        prop_assert_eq!(result.allocations.len(), expected_count);
    }
}
