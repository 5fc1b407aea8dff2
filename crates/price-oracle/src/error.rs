//! Price oracle error types

use thiserror::Error;

/// Errors that fail a whole price batch.
///
/// Only the batched contract spot call can fail a batch. Per-token lookups
/// (window averages, the native token) become
/// [`PriceResolution::Unresolved`](common::PriceResolution) entries instead.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Transport failure (connect, timeout, TLS)
    #[error("Price API unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    /// Non-2xx response
    #[error("Price API returned {status} for {url}")]
    Status { url: String, status: u16 },

    /// 2xx response with an undecodable body
    #[error("Price API returned an unexpected body for {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Client could not be built
    #[error("Price oracle configuration error: {0}")]
    Config(String),
}

impl OracleError {
    pub fn unavailable(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Worth retrying: transport failures, 429 and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            OracleError::Unavailable { .. } => true,
            OracleError::Status { status, .. } => *status == 429 || *status >= 500,
            OracleError::Decode { .. } | OracleError::Config(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
