//! Valuation orchestration engine: comparable selection, independent method
//! evaluators, trend and condition adjustment, and confidence-weighted
//! reconciliation into an auditable valuation record.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
