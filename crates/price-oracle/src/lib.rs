//! Token price resolution
//!
//! Resolves token addresses (and the zero address for a chain's native gas
//! token) to USD, either at spot or averaged over a time window.
//!
//! # Core Components
//!
//! - [`PriceOracle`] - the narrow interface the rest of the service consumes
//! - [`coingecko`] - live prices from a CoinGecko-compatible API
//! - [`fixed`] - constant rate used for testnet chains
//! - [`routing`] - picks the fixed rate or the live API per chain
//! - [`mock`] - in-memory oracle for tests
//!
//! # Key Invariants
//!
//! - A per-token failure never fails the batch; it yields `Unresolved`
//! - A price that is non-finite or ≤ 0 is `Unresolved`
//! - Results are keyed by the requested address, even when an alias was queried

pub mod coingecko;
pub mod error;
pub mod fixed;
pub mod mock;
pub mod routing;

use async_trait::async_trait;
use common::{Address, ChainConfig, PriceTable};

pub use coingecko::{CoinGeckoConfig, CoinGeckoOracle};
pub use error::{OracleError, Result};
pub use fixed::FixedRateOracle;
pub use mock::StaticPriceOracle;
pub use routing::ChainRoutingOracle;

/// Token → USD lookup
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Spot prices for `tokens` on `chain`
    async fn current_prices(&self, chain: &ChainConfig, tokens: &[Address]) -> Result<PriceTable>;

    /// Prices averaged over `[start, end]` (unix seconds)
    async fn average_prices(
        &self,
        chain: &ChainConfig,
        tokens: &[Address],
        start: i64,
        end: i64,
    ) -> Result<PriceTable>;
}

/// Sorted, de-duplicated token list
pub(crate) fn unique_tokens(tokens: &[Address]) -> Vec<Address> {
    let mut unique = tokens.to_vec();
    unique.sort();
    unique.dedup();
    unique
}
