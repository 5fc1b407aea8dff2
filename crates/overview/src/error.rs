//! Overview error types

use std::time::Duration;

use common::ChainId;
use matching_engine::MatchingError;
use price_oracle::OracleError;
use round_data::RoundDataError;
use thiserror::Error;

/// Everything that can fail one funding overview
#[derive(Error, Debug)]
pub enum OverviewError {
    /// Malformed request parameters
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Chain {0} is not configured")]
    UnknownChain(ChainId),

    #[error(transparent)]
    RoundData(#[from] RoundDataError),

    #[error(transparent)]
    Prices(#[from] OracleError),

    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error("Round computation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Round computation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OverviewError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Stable label for the failure metric
    pub fn kind(&self) -> &'static str {
        match self {
            OverviewError::InvalidInput(_) | OverviewError::UnknownChain(_) => "invalid_input",
            OverviewError::RoundData(e) => match e {
                RoundDataError::RoundNotFound { .. } => "round_not_found",
                RoundDataError::MetadataUnavailable { .. } => "metadata_unavailable",
                RoundDataError::Unavailable { .. }
                | RoundDataError::Status { .. }
                | RoundDataError::Decode { .. } => "upstream_unavailable",
                RoundDataError::Config(_) => "config",
                RoundDataError::Validation(_)
                | RoundDataError::InvalidRegistryEntry(_)
                | RoundDataError::DuplicatePayoutAddress { .. } => "invalid_upstream_data",
            },
            OverviewError::Prices(OracleError::Config(_)) => "config",
            OverviewError::Prices(_) => "upstream_unavailable",
            OverviewError::Matching(MatchingError::Validation(_)) => "invalid_upstream_data",
            OverviewError::Matching(MatchingError::InvariantViolation(_)) => "invariant_violation",
            OverviewError::Timeout(_) => "timeout",
            OverviewError::Cancelled => "cancelled",
            OverviewError::Config(_) => "config",
        }
    }

    /// Engine bugs and configuration faults, as opposed to bad input or a
    /// flaky upstream
    pub fn is_internal(&self) -> bool {
        matches!(self.kind(), "invariant_violation" | "config")
    }
}

impl From<common::Error> for OverviewError {
    fn from(e: common::Error) -> Self {
        match e {
            common::Error::Config(msg) => OverviewError::Config(msg),
            other => OverviewError::InvalidInput(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OverviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let not_found = OverviewError::from(RoundDataError::RoundNotFound {
            chain_id: ChainId::POLYGON,
            round_id: "0x01".into(),
        });
        assert_eq!(not_found.kind(), "round_not_found");
        assert_eq!(OverviewError::Timeout(Duration::from_secs(1)).kind(), "timeout");
        assert_eq!(
            OverviewError::from(MatchingError::invariant("sum")).kind(),
            "invariant_violation"
        );
        assert!(OverviewError::from(MatchingError::invariant("sum")).is_internal());
        assert!(!OverviewError::invalid_input("round").is_internal());
        assert_eq!(
            OverviewError::from(MatchingError::validation("cap 150")).kind(),
            "invalid_upstream_data"
        );
    }

    #[test]
    fn test_common_error_conversion() {
        let err = OverviewError::from(common::Error::invalid_input("bad pricing"));
        assert!(matches!(err, OverviewError::InvalidInput(_)));
    }
}
