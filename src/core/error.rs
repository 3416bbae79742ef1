//! Domain errors raised by the planning core.
//!
//! None of these are fatal to the process. The CLI decides how to render
//! each one; the core only labels what went wrong.

use super::category::AssetCategory;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Nothing selected: {0}")]
    EmptySelection(String),

    #[error("Allocation is empty: every selected category was clamped to 0% at this risk level")]
    DegenerateAllocation,

    #[error("Insufficient data: no overlapping price history across the selected instruments")]
    InsufficientData { excluded: Vec<String> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PlanError {
    pub fn no_instruments(category: AssetCategory) -> Self {
        PlanError::EmptySelection(format!("no instruments chosen for {category}"))
    }
}

/// A per-instrument problem that was recovered from locally.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentWarning {
    pub instrument: String,
    pub reason: String,
}

impl InstrumentWarning {
    pub fn new(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }
}
