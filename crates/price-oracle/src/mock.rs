//! In-memory oracle for tests

use async_trait::async_trait;
use common::{Address, ChainConfig, ChainId, PriceResolution, PriceTable};
use parking_lot::Mutex;

use crate::error::{OracleError, Result};
use crate::{unique_tokens, PriceOracle};

/// One recorded oracle call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceCall {
    Spot { chain: ChainId, tokens: Vec<Address> },
    Average { chain: ChainId, tokens: Vec<Address>, start: i64, end: i64 },
}

/// Oracle answering from a fixed table and recording every call
#[derive(Debug, Default)]
pub struct StaticPriceOracle {
    prices: PriceTable,
    fail: bool,
    calls: Mutex<Vec<PriceCall>>,
}

impl StaticPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, token: Address, usd: f64) -> Self {
        self.prices.insert(token, PriceResolution::from_price(usd));
        self
    }

    pub fn with_unresolved(mut self, token: Address, reason: impl Into<String>) -> Self {
        self.prices.insert(token, PriceResolution::unresolved(reason));
        self
    }

    /// Every call fails as if the API were down
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<PriceCall> {
        self.calls.lock().clone()
    }

    fn answer(&self, tokens: &[Address]) -> Result<PriceTable> {
        if self.fail {
            return Err(OracleError::unavailable("memory://prices", "configured to fail"));
        }
        Ok(tokens
            .iter()
            .map(|t| {
                let resolution = self
                    .prices
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| PriceResolution::unresolved("unknown token"));
                (*t, resolution)
            })
            .collect())
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn current_prices(&self, chain: &ChainConfig, tokens: &[Address]) -> Result<PriceTable> {
        let tokens = unique_tokens(tokens);
        self.calls.lock().push(PriceCall::Spot {
            chain: chain.id,
            tokens: tokens.clone(),
        });
        self.answer(&tokens)
    }

    async fn average_prices(
        &self,
        chain: &ChainConfig,
        tokens: &[Address],
        start: i64,
        end: i64,
    ) -> Result<PriceTable> {
        let tokens = unique_tokens(tokens);
        self.calls.lock().push(PriceCall::Average {
            chain: chain.id,
            tokens: tokens.clone(),
            start,
            end,
        });
        self.answer(&tokens)
    }
}
