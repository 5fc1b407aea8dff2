use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default configuration file location
pub const DEFAULT_CONFIG: &str = "config/qfx.yaml";

#[derive(Parser, Debug)]
#[command(name = "qfx")]
#[command(about = "QF matching service - quadratic funding distributions for tipping rounds")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Log output format; overrides `service.log_format`
    #[arg(long, global = true, value_enum, env = "QFX_LOG_FORMAT")]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the funding overview API
    Start {
        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override HTTP port
        #[arg(long)]
        http: Option<u16>,
    },

    /// Validate configuration without starting the server
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },

    /// Compute one round's funding overview and print it as JSON
    Compute {
        /// Round contract address
        #[arg(short, long)]
        round: String,

        /// Chain id; defaults to `default_chain_id`
        #[arg(long)]
        chain: Option<u64>,

        /// Price sampling; defaults to `engine.pricing`
        #[arg(long, value_enum)]
        pricing: Option<PricingArg>,

        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        config: PathBuf,

        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
    Compact,
}

impl LogFormatArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PricingArg {
    /// Current price at request time
    Spot,
    /// Average over the round window
    Average,
}

impl PricingArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingArg::Spot => "spot",
            PricingArg::Average => "average",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
