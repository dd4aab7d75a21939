use crate::error::Result;
use crate::portfolio::{Position, validate_positions};
use crate::protocol::{DEFAULT_RISK_SCORE, ProtocolCatalog};

/// Simple composite portfolio risk score
///
/// Treats `risk_score` as a security grade: each position contributes
/// `(10 - risk_score) * allocation / 100`. Protocols missing from the
/// catalog fall back to a score of 5 and 0% APY. There is no normalization
/// by total allocation, so totals above 100% legitimately push the result
/// past the nominal 0-10 range.
///
/// This is deliberately distinct from the allocation-normalized
/// [`crate::risk::evaluate_portfolio_risk`]; the two are not interchangeable.
pub fn score(positions: &[Position], catalog: &ProtocolCatalog) -> Result<f64> {
    validate_positions(positions)?;

    Ok(positions
        .iter()
        .map(|position| {
            let risk_score = catalog
                .resolve(&position.protocol)
                .map(|p| p.risk_score)
                .unwrap_or(DEFAULT_RISK_SCORE);
            (10.0 - f64::from(risk_score)) * (position.allocation / 100.0)
        })
        .sum())
}

/// Allocation-weighted portfolio yield, in percent
///
/// Same resolution rules as [`score`]: unknown protocols contribute 0% APY.
pub fn portfolio_yield(positions: &[Position], catalog: &ProtocolCatalog) -> Result<f64> {
    validate_positions(positions)?;

    Ok(positions
        .iter()
        .map(|position| {
            let apy = catalog
                .resolve(&position.protocol)
                .map(|p| p.apy)
                .unwrap_or(0.0);
            apy * (position.allocation / 100.0)
        })
        .sum())
}
