//! Round data error types

use common::{ChainId, RegistryError, RoundOnChain};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoundDataError {
    /// The subgraph has no round with this id
    #[error("Round {round_id} not found on chain {chain_id}")]
    RoundNotFound { chain_id: ChainId, round_id: String },

    /// The round exists but its metadata document could not be read
    #[error("Metadata for round {round_id} is unavailable: {reason}")]
    MetadataUnavailable {
        round_id: String,
        round: Box<RoundOnChain>,
        reason: String,
    },

    /// Transport failure (connect, timeout, TLS)
    #[error("{service} unavailable at {url}: {reason}")]
    Unavailable {
        service: &'static str,
        url: String,
        reason: String,
    },

    /// Non-2xx response
    #[error("{service} returned {status} for {url}")]
    Status {
        service: &'static str,
        url: String,
        status: u16,
    },

    /// 2xx response that is not the expected shape, or a GraphQL error body
    #[error("{service} returned an unexpected body for {url}: {reason}")]
    Decode {
        service: &'static str,
        url: String,
        reason: String,
    },

    /// A feed or registry record failed validation
    #[error("Invalid record: {0}")]
    Validation(String),

    #[error("Invalid registry entry id '{0}': expected 'applicationId-roundId'")]
    InvalidRegistryEntry(String),

    #[error("Payout address {address} is shared by projects {first} and {second}")]
    DuplicatePayoutAddress {
        address: String,
        first: String,
        second: String,
    },

    #[error("Round data configuration error: {0}")]
    Config(String),
}

impl RoundDataError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn metadata_unavailable(round: RoundOnChain, reason: impl ToString) -> Self {
        Self::MetadataUnavailable {
            round_id: common::checksum(&round.id),
            round: Box::new(round),
            reason: reason.to_string(),
        }
    }

    /// Worth retrying: transport failures, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            RoundDataError::Unavailable { .. } => true,
            RoundDataError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Failure talking to the subgraph or the gateway
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            RoundDataError::Unavailable { .. }
                | RoundDataError::Status { .. }
                | RoundDataError::Decode { .. }
        )
    }
}

impl From<RegistryError> for RoundDataError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidEntryId(id) => RoundDataError::InvalidRegistryEntry(id),
            RegistryError::DuplicatePayoutAddress {
                address,
                first,
                second,
            } => RoundDataError::DuplicatePayoutAddress {
                address,
                first: first.to_string(),
                second: second.to_string(),
            },
            RegistryError::DuplicateProject(project) => {
                RoundDataError::Validation(format!("project {} is listed more than once", project))
            }
        }
    }
}

impl From<common::Error> for RoundDataError {
    fn from(err: common::Error) -> Self {
        RoundDataError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RoundDataError>;
