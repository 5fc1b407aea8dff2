//! Per-chain oracle selection

use std::sync::Arc;

use async_trait::async_trait;
use common::{Address, ChainConfig, PriceTable};
use tracing::debug;

use crate::error::Result;
use crate::fixed::FixedRateOracle;
use crate::PriceOracle;

/// Uses the fixed testnet rate on testnet chains and the live oracle elsewhere
#[derive(Clone)]
pub struct ChainRoutingOracle {
    live: Arc<dyn PriceOracle>,
    testnet: FixedRateOracle,
}

impl ChainRoutingOracle {
    pub fn new(live: Arc<dyn PriceOracle>, testnet: FixedRateOracle) -> Self {
        Self { live, testnet }
    }

    fn pick(&self, chain: &ChainConfig) -> &dyn PriceOracle {
        if chain.testnet {
            debug!(chain_id = %chain.id, rate = self.testnet.rate(), "Using testnet price rate");
            &self.testnet
        } else {
            self.live.as_ref()
        }
    }
}

#[async_trait]
impl PriceOracle for ChainRoutingOracle {
    async fn current_prices(&self, chain: &ChainConfig, tokens: &[Address]) -> Result<PriceTable> {
        self.pick(chain).current_prices(chain, tokens).await
    }

    async fn average_prices(
        &self,
        chain: &ChainConfig,
        tokens: &[Address],
        start: i64,
        end: i64,
    ) -> Result<PriceTable> {
        self.pick(chain).average_prices(chain, tokens, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::StaticPriceOracle;
    use common::{ChainId, ChainRegistry};

    #[tokio::test]
    async fn test_routes_by_testnet_flag() {
        let token = Address::repeat_byte(3);
        let live = Arc::new(StaticPriceOracle::new().with_price(token, 2.0));
        let oracle = ChainRoutingOracle::new(live.clone(), FixedRateOracle::new(1000.0));
        let registry = ChainRegistry::builtin();

        let mainnet = oracle
            .current_prices(registry.get(ChainId::POLYGON).unwrap(), &[token])
            .await
            .unwrap();
        assert_eq!(mainnet[&token].usd(), Some(2.0));

        let testnet = oracle
            .current_prices(registry.get(ChainId::GOERLI).unwrap(), &[token])
            .await
            .unwrap();
        assert_eq!(testnet[&token].usd(), Some(1000.0));
        assert_eq!(live.calls().len(), 1);
    }
}
