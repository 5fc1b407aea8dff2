use serde::{Deserialize, Serialize};

use common::{ChainConfig, ChainId, ChainRegistry, PricingPolicy, RetryPolicy};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

// ==================================================================================
// SERVICE
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// pretty, json or compact
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Prometheus exporter port; metrics are disabled when absent
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl ServiceConfig {
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

// ==================================================================================
// UPSTREAM (subgraph, content gateway, price API)
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Content gateway host, e.g. `gitcoin.mypinata.cloud`
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,
    #[serde(default = "default_price_api_base")]
    pub price_api_base: String,
    #[serde(default)]
    pub price_api_key: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            ipfs_gateway: default_ipfs_gateway(),
            price_api_base: default_price_api_base(),
            price_api_key: None,
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            retry: RetryPolicy::default(),
            page_size: default_page_size(),
        }
    }
}

// ==================================================================================
// METADATA CACHE
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

// ==================================================================================
// ENGINE
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pricing: PricingPolicy,
    /// USD rate applied to every token on testnet chains
    #[serde(default = "default_testnet_usd_rate")]
    pub testnet_usd_rate: f64,
    /// Upper bound on one round computation, fetches included
    #[serde(default = "default_round_timeout_seconds")]
    pub round_timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pricing: PricingPolicy::default(),
            testnet_usd_rate: default_testnet_usd_rate(),
            round_timeout_seconds: default_round_timeout_seconds(),
        }
    }
}

// ==================================================================================
// MASTER
// ==================================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasterConfig {
    pub service: ServiceConfig,
    /// Chain table; the built-in table is used when absent
    #[serde(default)]
    pub chains: Option<Vec<ChainConfig>>,
    #[serde(default)]
    pub default_chain_id: Option<u64>,
    #[serde(default)]
    pub upstream: Option<UpstreamConfig>,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

impl MasterConfig {
    pub fn chains(&self) -> Vec<ChainConfig> {
        self.chains.clone().unwrap_or_else(common::chain::builtin_chains)
    }

    pub fn default_chain(&self) -> ChainId {
        ChainId(self.default_chain_id.unwrap_or_else(default_chain_id))
    }

    pub fn upstream(&self) -> UpstreamConfig {
        self.upstream.clone().unwrap_or_default()
    }

    pub fn cache(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    pub fn engine(&self) -> EngineConfig {
        self.engine.clone().unwrap_or_default()
    }

    /// Build the chain routing table
    pub fn chain_registry(&self) -> common::Result<ChainRegistry> {
        ChainRegistry::new(self.chains(), self.default_chain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_config() {
        let config = parser::generate_default_config();

        assert_eq!(config.service.name, "qfx");
        assert_eq!(config.service.http_port, 8080);
        assert!(config.chains.is_none());
        assert_eq!(config.default_chain(), ChainId::LOCAL_ROUND_LAB);
        assert_eq!(config.engine().pricing, PricingPolicy::Average);

        let registry = config.chain_registry().unwrap();
        assert!(registry.get(ChainId::POLYGON).is_some());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = r#"
service:
  name: "qfx-test"
"#;
        let config: MasterConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.service.host, "0.0.0.0");
        assert_eq!(config.service.log_format, "pretty");
        assert_eq!(config.upstream().ipfs_gateway, "gitcoin.mypinata.cloud");
        assert_eq!(config.upstream().retry, RetryPolicy::default());
        assert_eq!(config.cache().ttl_seconds, 300);
        assert_eq!(config.engine().testnet_usd_rate, 1000.0);
    }

    #[test]
    fn test_chain_table_parsing() {
        let yaml = r#"
service:
  name: "qfx-test"
  http_port: 9000
default_chain_id: 137
chains:
  - id: 137
    name: "Polygon"
    price_platform: "polygon-pos"
    subgraph_url: "https://example.com/subgraphs/polygon"
    explorer_url: "https://polygonscan.com"
    tokens:
      - address: "0x0d500b1d8e8ef31e21c99d1db9a6444d3adf1270"
        symbol: "WMATIC"
        decimals: 18
  - id: 80001
    name: "Mumbai"
    testnet: true
    subgraph_url: "https://example.com/subgraphs/mumbai"
engine:
  pricing: spot
  round_timeout_seconds: 10
"#;
        let config: MasterConfig = serde_yaml::from_str(yaml).unwrap();
        let registry = config.chain_registry().unwrap();

        assert_eq!(registry.default_chain(), ChainId::POLYGON);
        assert!(registry.is_testnet(ChainId::MUMBAI));
        assert_eq!(registry.get(ChainId::POLYGON).unwrap().tokens.len(), 1);
        assert_eq!(config.engine().pricing, PricingPolicy::Spot);
        assert_eq!(config.engine().testnet_usd_rate, 1000.0);
    }
}
