use thiserror::Error;

/// Failures surfaced by the portfolio engine
///
/// Every core function fails fast with one of these variants instead of
/// letting a zero division propagate NaN/Infinity into downstream results.
/// Translating failures into user-facing responses is the caller's job.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed caller input (empty portfolio, non-finite allocation, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Not enough catalog data to run the requested computation
    #[error("insufficient protocols: {0}")]
    InsufficientData(String),

    /// Total allocation of zero in a ratio-based computation
    #[error("total allocation is zero")]
    ZeroAllocation,
}

pub type Result<T> = std::result::Result<T, EngineError>;
