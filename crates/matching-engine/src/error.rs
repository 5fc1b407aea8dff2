//! Matching engine error types

use thiserror::Error;

/// Errors that can occur while computing a distribution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchingError {
    /// Inputs the engine refuses to compute with
    #[error("Invalid matching input: {0}")]
    Validation(String),

    /// A post-computation check failed; never clamped away
    #[error("Computation invariant violated: {0}")]
    InvariantViolation(String),
}

impl MatchingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
