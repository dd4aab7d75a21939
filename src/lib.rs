//! DeFi portfolio risk-and-optimization engine
//!
//! Pure computations over caller-supplied `(portfolio, catalog)` snapshots:
//! composite risk scoring, HHI-based concentration metrics, greedy
//! reallocation suggestions, risk-adjusted portfolio optimization and fixed
//! market-scenario projections. Nothing here performs I/O or holds state
//! between calls; persistence, protocol-data ingestion and presentation are
//! collaborator concerns.

pub mod advisor;
pub mod concentration;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod portfolio;
pub mod protocol;
pub mod risk;
pub mod scenarios;
pub mod scoring;

pub use error::{EngineError, Result};
