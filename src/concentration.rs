use crate::error::{EngineError, Result};
use crate::portfolio::{Position, total_allocation, validate_positions};
use crate::protocol::ProtocolCatalog;
use std::collections::HashMap;

/// Herfindahl-Hirschman Index over a set of group allocations
///
/// Sum of squared allocation shares; ranges from 1/n (equal split across n
/// groups) to 1 (single group).
fn hhi<I>(group_allocations: I, total: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    group_allocations
        .into_iter()
        .map(|allocation| {
            let share = allocation / total;
            share * share
        })
        .sum()
}

/// HHI-based concentration score at single-position granularity
///
/// Returns `1 + 9 * HHI`, so the result lies in [1, 10]: 1 is maximally
/// diversified, 10 a single holding. A zero total allocation is a defined
/// failure, never a silent NaN.
pub fn concentration_risk(positions: &[Position]) -> Result<f64> {
    validate_positions(positions)?;
    let total = total_allocation(positions);
    if total == 0.0 {
        return Err(EngineError::ZeroAllocation);
    }

    Ok(1.0 + 9.0 * hhi(positions.iter().map(|p| p.allocation), total))
}

/// HHI-based diversification score grouped by blockchain
///
/// Same range and direction as [`concentration_risk`], but allocations are
/// first summed per chain. Positions that do not resolve against the catalog
/// are grouped together under an unknown chain.
pub fn chain_diversification(positions: &[Position], catalog: &ProtocolCatalog) -> Result<f64> {
    validate_positions(positions)?;
    let total = total_allocation(positions);
    if total == 0.0 {
        return Err(EngineError::ZeroAllocation);
    }

    let mut chain_allocations: HashMap<&str, f64> = HashMap::new();
    for position in positions {
        let chain = catalog
            .resolve(&position.protocol)
            .map(|p| p.blockchain.as_str())
            .unwrap_or("unknown");
        *chain_allocations.entry(chain).or_insert(0.0) += position.allocation;
    }

    Ok(1.0 + 9.0 * hhi(chain_allocations.into_values(), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolInfo;

    fn proto(id: &str, blockchain: &str) -> ProtocolInfo {
        ProtocolInfo {
            id: id.to_string(),
            name: id.to_string(),
            blockchain: blockchain.to_string(),
            category: "lending".to_string(),
            tvl: 1e9,
            apy: 5.0,
            risk_score: 4,
            audited: false,
        }
    }

    #[test]
    fn test_single_position_scores_ten() {
        let positions = vec![Position::new("aave", 100.0)];
        assert_eq!(concentration_risk(&positions).unwrap(), 10.0);
    }

    #[test]
    fn test_equal_weights_score_one_plus_nine_over_n() {
        for n in [2usize, 3, 5, 8] {
            let positions: Vec<Position> = (0..n)
                .map(|i| Position::new(format!("p{i}"), 100.0 / n as f64))
                .collect();
            let expected = 1.0 + 9.0 / n as f64;
            let got = concentration_risk(&positions).unwrap();
            assert!(
                (got - expected).abs() < 1e-9,
                "n={n}: expected {expected}, got {got}"
            );
        }
    }

    #[test]
    fn test_zero_total_allocation_is_an_error() {
        let positions = vec![Position::new("aave", 0.0), Position::new("eth", 0.0)];
        assert_eq!(
            concentration_risk(&positions),
            Err(EngineError::ZeroAllocation)
        );
    }

    #[test]
    fn test_chain_diversification_groups_by_blockchain() {
        let catalog: ProtocolCatalog = vec![
            proto("aave", "ethereum"),
            proto("uniswap", "ethereum"),
            proto("raydium", "solana"),
        ]
        .into();

        // 2/3 on ethereum, 1/3 on solana: HHI = 4/9 + 1/9 = 5/9
        let positions = vec![
            Position::new("aave", 33.0),
            Position::new("uniswap", 33.0),
            Position::new("raydium", 33.0),
        ];
        let expected = 1.0 + 9.0 * (5.0 / 9.0);
        let got = chain_diversification(&positions, &catalog).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unresolved_positions_share_one_chain_group() {
        let catalog = ProtocolCatalog::new();
        let positions = vec![
            Position::new("mystery-a", 50.0),
            Position::new("mystery-b", 50.0),
        ];
        // Both fall into the unknown group: fully concentrated
        assert_eq!(chain_diversification(&positions, &catalog).unwrap(), 10.0);
    }
}
