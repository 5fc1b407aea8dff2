use crate::*;
use std::collections::BTreeSet;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Service name is required")]
    MissingServiceName,

    #[error("{field} must be a valid port (1-65535)")]
    InvalidPort { field: String },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Chain table is empty")]
    NoChains,

    #[error("Chain id {0} is defined more than once")]
    DuplicateChain(u64),

    #[error("default_chain_id {0} is not in the chain table")]
    UnknownDefaultChain(u64),

    #[error("Chain {id}: {message}")]
    InvalidChain { id: u64, message: String },

    #[error("{field} is not a valid URL: {message}")]
    InvalidUrl { field: String, message: String },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a positive float")]
    InvalidPositiveFloat { field: String },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_service(&config.service, &mut report);
    validate_chains(config, &mut report);

    match &config.upstream {
        Some(upstream) => validate_upstream(upstream, &mut report),
        None => report.add_default("upstream", "built-in upstream defaults"),
    }

    match &config.cache {
        Some(cache) => validate_cache(cache, &mut report),
        None => report.add_default(
            "cache",
            &format!("enabled, ttl {}s", default_ttl_seconds()),
        ),
    }

    match &config.engine {
        Some(engine) => validate_engine(engine, &mut report),
        None => report.add_default(
            "engine",
            &format!(
                "pricing {}, testnet rate {} USD",
                common::PricingPolicy::default(),
                default_testnet_usd_rate()
            ),
        ),
    }

    report
}

fn validate_service(service: &ServiceConfig, report: &mut ValidationReport) {
    if service.name.trim().is_empty() {
        report.add_error(ValidationError::MissingServiceName);
    }

    if service.http_port == 0 {
        report.add_error(ValidationError::InvalidPort {
            field: "service.http_port".to_string(),
        });
    }

    match service.metrics_port {
        Some(0) => report.add_error(ValidationError::InvalidPort {
            field: "service.metrics_port".to_string(),
        }),
        Some(port) if port == service.http_port => report.add_error(ValidationError::InvalidPort {
            field: "service.metrics_port (collides with http_port)".to_string(),
        }),
        Some(_) => {}
        None => report.add_warning("service.metrics_port", "Not set, metrics exporter disabled"),
    }

    if !["pretty", "json", "compact"].contains(&service.log_format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(service.log_format.clone()));
    }
}

fn validate_chains(config: &MasterConfig, report: &mut ValidationReport) {
    if config.chains.is_none() {
        report.add_default("chains", "built-in chain table");
    }
    if config.default_chain_id.is_none() {
        report.add_default("default_chain_id", &default_chain_id().to_string());
    }

    let chains = config.chains();
    if chains.is_empty() {
        report.add_error(ValidationError::NoChains);
        return;
    }

    let mut seen = BTreeSet::new();
    for chain in &chains {
        if !seen.insert(chain.id.0) {
            report.add_error(ValidationError::DuplicateChain(chain.id.0));
        }
        validate_chain(chain, report);
    }

    let default_chain = config.default_chain();
    if !seen.contains(&default_chain.0) {
        report.add_error(ValidationError::UnknownDefaultChain(default_chain.0));
    }
}

fn validate_chain(chain: &common::ChainConfig, report: &mut ValidationReport) {
    let id = chain.id.0;
    let field = format!("chains.{}.subgraph_url", id);

    if chain.name.trim().is_empty() {
        report.add_error(ValidationError::InvalidChain {
            id,
            message: "name is required".to_string(),
        });
    }

    if chain.subgraph_url.is_empty() {
        report.add_warning(&field, "Not set, rounds on this chain cannot be loaded");
    } else if has_unresolved_env_vars(&chain.subgraph_url) {
        for var in unresolved_env_vars(&chain.subgraph_url) {
            report.add_warning(&field, &format!("Environment variable '{}' is not set", var));
        }
    } else if let Err(e) = Url::parse(&chain.subgraph_url) {
        report.add_error(ValidationError::InvalidUrl {
            field,
            message: e.to_string(),
        });
    }

    if !chain.testnet && chain.price_platform.is_none() {
        report.add_warning(
            &format!("chains.{}.price_platform", id),
            "Mainnet chain without a price platform, all prices will be unresolved",
        );
    }

    for (from, to) in &chain.price_aliases {
        if chain.token(to).is_none() {
            report.add_warning(
                &format!("chains.{}.price_aliases", id),
                &format!(
                    "Alias target {} for {} is not a known token",
                    common::checksum(to),
                    common::checksum(from)
                ),
            );
        }
    }
}

fn validate_upstream(upstream: &UpstreamConfig, report: &mut ValidationReport) {
    if upstream.ipfs_gateway.trim().is_empty() {
        report.add_error(ValidationError::InvalidUrl {
            field: "upstream.ipfs_gateway".to_string(),
            message: "gateway host is required".to_string(),
        });
    }

    if let Err(e) = Url::parse(&upstream.price_api_base) {
        report.add_error(ValidationError::InvalidUrl {
            field: "upstream.price_api_base".to_string(),
            message: e.to_string(),
        });
    }

    if let Some(key) = &upstream.price_api_key {
        for var in unresolved_env_vars(key) {
            report.add_error(ValidationError::InvalidEnvVar {
                var,
                message: "price API key placeholder was not substituted".to_string(),
            });
        }
    }

    if upstream.request_timeout_ms == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "upstream.request_timeout_ms".to_string(),
        });
    }
    if upstream.max_concurrent_requests == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "upstream.max_concurrent_requests".to_string(),
        });
    }
    if upstream.page_size == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "upstream.page_size".to_string(),
        });
    }
    if upstream.retry.max_attempts == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "upstream.retry.max_attempts".to_string(),
        });
    }
}

fn validate_cache(cache: &CacheConfig, report: &mut ValidationReport) {
    if !cache.enabled {
        report.add_warning("cache.enabled", "Metadata cache disabled, every request hits upstream");
        return;
    }
    if cache.ttl_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "cache.ttl_seconds".to_string(),
        });
    }
    if cache.max_entries == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "cache.max_entries".to_string(),
        });
    }
}

fn validate_engine(engine: &EngineConfig, report: &mut ValidationReport) {
    if !engine.testnet_usd_rate.is_finite() || engine.testnet_usd_rate <= 0.0 {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "engine.testnet_usd_rate".to_string(),
        });
    }
    if engine.round_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "engine.round_timeout_seconds".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&generate_default_config());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.defaults_applied.iter().any(|d| d.field == "chains"));
        assert!(report.defaults_applied.iter().any(|d| d.field == "engine"));
    }

    #[test]
    fn test_unknown_default_chain() {
        let mut config = generate_default_config();
        config.default_chain_id = Some(999);
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::UnknownDefaultChain(999)]);
    }

    #[test]
    fn test_bad_engine_values() {
        let mut config = generate_default_config();
        config.engine = Some(EngineConfig {
            pricing: common::PricingPolicy::Spot,
            testnet_usd_rate: -1.0,
            round_timeout_seconds: 0,
        });
        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_unresolved_subgraph_url_is_warning() {
        let yaml = r#"
service:
  name: "qfx"
  metrics_port: 9090
chains:
  - id: 1
    name: "Ethereum"
    price_platform: "ethereum"
    subgraph_url: "${QFX_TEST_UNSET_SUBGRAPH}"
default_chain_id: 1
"#;
        std::env::remove_var("QFX_TEST_UNSET_SUBGRAPH");
        let config = parse_config(yaml).unwrap();
        let report = validate_config(&config);

        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.message.contains("QFX_TEST_UNSET_SUBGRAPH")));
    }

    #[test]
    fn test_metrics_port_collision() {
        let mut config = generate_default_config();
        config.service.metrics_port = Some(config.service.http_port);
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::InvalidPort { .. }]);
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = generate_default_config();
        config.service.log_format = "xml".to_string();
        let report = validate_config(&config);
        assert_matches!(report.errors.as_slice(), [ValidationError::InvalidLogFormat(_)]);
    }
}
