//! Live prices from a CoinGecko-compatible API
//!
//! Spot prices come from one batch call per chain plus one call for the
//! native token. Window averages are one `market_chart/range` call per
//! token, run concurrently under the client's request limit.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{
    checksum, retry_with_backoff, Address, ChainConfig, PriceResolution, PriceTable, RetryPolicy,
    NATIVE_TOKEN,
};
use futures::future::join_all;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{OracleError, Result};
use crate::{unique_tokens, PriceOracle};

const API_KEY_HEADER: &str = "x-cg-pro-api-key";

#[derive(Debug, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_concurrent_requests: usize,
    pub retry: RetryPolicy,
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_concurrent_requests: 8,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Quote {
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl MarketChart {
    /// Mean of the first and last sample in the window
    fn average(&self) -> PriceResolution {
        if let Some(error) = &self.error {
            return PriceResolution::unresolved(format!("price API error: {}", error));
        }
        match (self.prices.first(), self.prices.last()) {
            (Some(first), Some(last)) => PriceResolution::from_price((first.1 + last.1) / 2.0),
            _ => PriceResolution::unresolved("empty price series"),
        }
    }
}

fn quote_resolution(quote: Option<&Quote>) -> PriceResolution {
    match quote.and_then(|q| q.usd) {
        Some(usd) => PriceResolution::from_price(usd),
        None => PriceResolution::unresolved("no price returned"),
    }
}

fn api_address(address: &Address) -> String {
    checksum(address).to_lowercase()
}

fn unresolved_all(tokens: &[Address], reason: &str) -> PriceTable {
    tokens
        .iter()
        .map(|t| (*t, PriceResolution::unresolved(reason)))
        .collect()
}

/// HTTP price oracle
#[derive(Debug, Clone)]
pub struct CoinGeckoOracle {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    limiter: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl CoinGeckoOracle {
    pub fn new(config: CoinGeckoConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            retry: config.retry,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        retry_with_backoff(&self.retry, "price_api", OracleError::is_transient, || {
            self.get_once::<T>(&url, query)
        })
        .await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| OracleError::unavailable(url, e))?;

        let mut request = self
            .client
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        debug!(url, "Price API request");
        let response = request
            .send()
            .await
            .map_err(|e| OracleError::unavailable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<T>().await.map_err(|e| OracleError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Native gas token at spot. Failures after retries leave it unresolved.
    async fn native_spot_price(&self, platform: &str) -> PriceResolution {
        let query = [
            ("ids", platform.to_string()),
            ("vs_currencies", "usd".to_string()),
        ];
        match self
            .get_json::<HashMap<String, Quote>>("/simple/price", &query)
            .await
        {
            Ok(quotes) => quote_resolution(quotes.get(platform)),
            Err(e) => PriceResolution::unresolved(e.to_string()),
        }
    }

    async fn contract_spot_prices(
        &self,
        chain: &ChainConfig,
        platform: &str,
        contracts: &[Address],
    ) -> Result<PriceTable> {
        let mut queried: Vec<String> = contracts
            .iter()
            .map(|t| api_address(&chain.price_address(t)))
            .collect();
        queried.sort();
        queried.dedup();

        let query = [
            ("contract_addresses", queried.join(",")),
            ("vs_currencies", "usd".to_string()),
        ];
        let path = format!("/simple/token_price/{}", platform);
        let quotes: HashMap<String, Quote> = self.get_json(&path, &query).await?;

        Ok(contracts
            .iter()
            .map(|token| {
                let key = api_address(&chain.price_address(token));
                (*token, quote_resolution(quotes.get(&key)))
            })
            .collect())
    }

    async fn contract_average(
        &self,
        chain: &ChainConfig,
        platform: &str,
        token: Address,
        start: i64,
        end: i64,
    ) -> PriceResolution {
        let path = format!(
            "/coins/{}/contract/{}/market_chart/range",
            platform,
            api_address(&chain.price_address(&token))
        );
        let query = [
            ("vs_currency", "usd".to_string()),
            ("from", start.to_string()),
            ("to", end.to_string()),
        ];

        match self.get_json::<MarketChart>(&path, &query).await {
            Ok(chart) => chart.average(),
            Err(e) => PriceResolution::unresolved(e.to_string()),
        }
    }
}

fn log_unresolved(chain: &ChainConfig, table: &PriceTable) {
    for (token, resolution) in table {
        if let PriceResolution::Unresolved { reason } = resolution {
            warn!(
                chain_id = %chain.id,
                token = %checksum(token),
                reason = %reason,
                "Token price unresolved"
            );
        }
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn current_prices(&self, chain: &ChainConfig, tokens: &[Address]) -> Result<PriceTable> {
        let tokens = unique_tokens(tokens);
        let Some(platform) = chain.price_platform.as_deref() else {
            let table = unresolved_all(&tokens, "chain has no price platform");
            log_unresolved(chain, &table);
            return Ok(table);
        };

        let (native, contracts): (Vec<Address>, Vec<Address>) =
            tokens.into_iter().partition(|t| *t == NATIVE_TOKEN);

        let mut table = PriceTable::new();
        if !contracts.is_empty() {
            table.extend(self.contract_spot_prices(chain, platform, &contracts).await?);
        }
        if !native.is_empty() {
            table.insert(NATIVE_TOKEN, self.native_spot_price(platform).await);
        }

        log_unresolved(chain, &table);
        Ok(table)
    }

    async fn average_prices(
        &self,
        chain: &ChainConfig,
        tokens: &[Address],
        start: i64,
        end: i64,
    ) -> Result<PriceTable> {
        let tokens = unique_tokens(tokens);
        let Some(platform) = chain.price_platform.as_deref() else {
            let table = unresolved_all(&tokens, "chain has no price platform");
            log_unresolved(chain, &table);
            return Ok(table);
        };

        let (native, contracts): (Vec<Address>, Vec<Address>) =
            tokens.into_iter().partition(|t| *t == NATIVE_TOKEN);

        let lookups = contracts.iter().map(|token| async move {
            let resolution = self
                .contract_average(chain, platform, *token, start, end)
                .await;
            (*token, resolution)
        });
        let mut table: PriceTable = join_all(lookups).await.into_iter().collect();

        // The range endpoint has no native-token form; use spot
        if !native.is_empty() {
            table.insert(NATIVE_TOKEN, self.native_spot_price(platform).await);
        }

        log_unresolved(chain, &table);
        Ok(table)
    }
}
