//! QF Matching Service CLI and Server Binary
//!
//! Entry point for `qfx`. It can initialize and validate configuration,
//! serve the funding overview API, or compute a single round from the
//! command line.

use anyhow::{Context, Result};
use cli::{Cli, Commands, LogFormatArg, PricingArg};
use common::{canonical_address, ChainId, PricingPolicy};
use config::{generate_default_config, load_config, save_config, validate_config, MasterConfig};
use observability::{init_logging, init_metrics, LogFormat};
use overview::{create_router, OverviewApiState, OverviewAssembler, OverviewRequest};
use server::{
    validate_ports_available, HealthState, HttpServer, Server, ServerConfig, ShutdownController,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Start { config, host, http } => {
            let config = load_checked(&config, cli.log_format)?;
            info!("Executing 'start' command");
            start_service(config, host, http).await
        }
        Commands::Validate { config } => {
            init_logging("qfx", log_format(cli.log_format, None))?;
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("qfx", log_format(cli.log_format, None))?;
            info!("Executing 'init' command");
            init_command(output).await
        }
        Commands::Compute {
            round,
            chain,
            pricing,
            config,
            compact,
        } => {
            let config = load_checked(&config, cli.log_format)?;
            info!("Executing 'compute' command");
            compute_command(config, &round, chain, pricing, compact).await
        }
    }
}

/// CLI flag first, then `service.log_format`, then pretty
fn log_format(flag: Option<LogFormatArg>, config: Option<&MasterConfig>) -> LogFormat {
    let name = match flag {
        Some(flag) => Some(flag.as_str()),
        None => config.map(|c| c.service.log_format.as_str()),
    };
    name.and_then(LogFormat::parse).unwrap_or_default()
}

/// Load the config, start logging, and refuse to continue on validation errors
fn load_checked(path: &Path, flag: Option<LogFormatArg>) -> Result<MasterConfig> {
    let config = load_config(path)?;
    init_logging(&config.service.name, log_format(flag, Some(&config)))?;
    debug!(path = ?path, "Configuration file read");

    let report = validate_config(&config);
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot continue due to configuration errors");
    }
    Ok(config)
}

async fn start_service(
    config: MasterConfig,
    host_override: Option<String>,
    http_override: Option<u16>,
) -> Result<()> {
    let host = host_override.unwrap_or_else(|| config.service.host.clone());
    let http_port = http_override.unwrap_or(config.service.http_port);

    let mut server_config = ServerConfig::new(host, http_port);
    if let Some(metrics_port) = config.service.metrics_port {
        server_config = server_config.with_metrics_port(metrics_port);
    }
    validate_ports_available(&server_config).await?;

    if let Some(metrics_port) = config.service.metrics_port {
        init_metrics(metrics_port)?;
    }

    let assembler = OverviewAssembler::from_config(&config)
        .context("Failed to build the overview assembler")?;

    let shutdown = ShutdownController::with_signals();
    let router = create_router(
        OverviewApiState {
            assembler: Arc::new(assembler),
            shutdown: shutdown.token(),
        },
        HealthState::new(config.service.name.clone(), env!("CARGO_PKG_VERSION")),
    );

    info!(
        service = %config.service.name,
        address = %server_config.http_addr()?,
        "Starting funding overview API"
    );

    let server = HttpServer::new(server_config, router);
    server.run(shutdown.token()).await?;

    info!("Service stopped");
    Ok(())
}

async fn compute_command(
    config: MasterConfig,
    round: &str,
    chain: Option<u64>,
    pricing: Option<PricingArg>,
    compact: bool,
) -> Result<()> {
    let round_id = canonical_address(round).context("Invalid --round")?;
    let mut request = OverviewRequest::new(round_id);
    if let Some(chain) = chain {
        request = request.on_chain(ChainId(chain));
    }
    if let Some(pricing) = pricing {
        request = request.with_pricing(pricing.as_str().parse::<PricingPolicy>()?);
    }

    let assembler = OverviewAssembler::from_config(&config)
        .context("Failed to build the overview assembler")?;
    let shutdown = ShutdownController::with_signals();

    let overview = assembler
        .funding_overview(request, shutdown.token())
        .await
        .with_context(|| format!("Failed to compute round {}", round))?;

    let json = if compact {
        serde_json::to_string(&overview)?
    } else {
        serde_json::to_string_pretty(&overview)?
    };
    println!("{}", json);
    Ok(())
}

async fn validate_command(config_path: PathBuf) -> Result<()> {
    info!(path = ?config_path, "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    let chains = config.chain_registry()?;
    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("Listen: {}", config.service.http_address());
    println!("Default chain: {}", chains.default_chain());
    println!("Chains: {}", chains.chains().count());
    println!("Pricing: {}", config.engine().pricing);

    Ok(())
}

async fn init_command(output_path: PathBuf) -> Result<()> {
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();
    save_config(&config, &output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("This configuration includes:");
    println!("  - Service settings (name, host, HTTP port, log format)");
    println!("  - The built-in chain table (round lab default)");
    println!("  - Built-in upstream, cache and engine defaults");
    println!();
    println!("Next steps:");
    println!("  1. Add a 'chains' section with subgraph URLs for your deployments");
    println!("  2. Set required environment variables (subgraph URLs, price API key)");
    println!(
        "  3. Run 'qfx validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  4. Run 'qfx start --config {:?}' to serve the API",
        output_path
    );

    Ok(())
}
