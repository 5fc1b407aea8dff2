//! Constant-rate oracle for testnet chains

use async_trait::async_trait;
use common::{Address, ChainConfig, PriceResolution, PriceTable, NATIVE_TOKEN};

use crate::error::Result;
use crate::{unique_tokens, PriceOracle};

/// Default USD rate for testnet tokens
pub const TESTNET_USD_RATE: f64 = 1000.0;

/// Prices every token, and the native token, at one fixed rate without network access
#[derive(Debug, Clone, Copy)]
pub struct FixedRateOracle {
    rate: f64,
}

impl FixedRateOracle {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn table(&self, tokens: &[Address]) -> PriceTable {
        let mut tokens = unique_tokens(tokens);
        tokens.push(NATIVE_TOKEN);
        tokens
            .into_iter()
            .map(|t| (t, PriceResolution::from_price(self.rate)))
            .collect()
    }
}

impl Default for FixedRateOracle {
    fn default() -> Self {
        Self::new(TESTNET_USD_RATE)
    }
}

#[async_trait]
impl PriceOracle for FixedRateOracle {
    async fn current_prices(&self, _chain: &ChainConfig, tokens: &[Address]) -> Result<PriceTable> {
        Ok(self.table(tokens))
    }

    async fn average_prices(
        &self,
        _chain: &ChainConfig,
        tokens: &[Address],
        _start: i64,
        _end: i64,
    ) -> Result<PriceTable> {
        Ok(self.table(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ChainId, ChainRegistry};

    #[tokio::test]
    async fn test_fixed_rate_includes_native_token() {
        let registry = ChainRegistry::builtin();
        let chain = registry.get(ChainId::MUMBAI).unwrap();
        let token = Address::repeat_byte(7);

        let table = FixedRateOracle::default()
            .current_prices(chain, &[token, token])
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table[&token].usd(), Some(TESTNET_USD_RATE));
        assert_eq!(table[&NATIVE_TOKEN].usd(), Some(TESTNET_USD_RATE));
    }
}
