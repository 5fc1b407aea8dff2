use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/qfx.yaml";

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MasterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());
    parse_config(&content)
}

/// Parse configuration text after environment substitution
pub fn parse_config(content: &str) -> Result<MasterConfig> {
    let substituted = substitution::substitute_env_vars(content)?;

    let config: MasterConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!(
        service = %config.service.name,
        chains = config.chains.as_ref().map(|c| c.len()).unwrap_or(0),
        "Configuration loaded"
    );
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> MasterConfig {
    MasterConfig {
        service: ServiceConfig {
            name: "qfx".to_string(),
            host: default_host(),
            http_port: default_http_port(),
            log_format: default_log_format(),
            metrics_port: None,
        },
        // Optional sections fall back to built-in defaults
        chains: None,
        default_chain_id: None,
        upstream: None,
        cache: None,
        engine: None,
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &MasterConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
