use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use foisync::config::{Config, LoggingConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "foisync",
    version,
    about = "Fetch historic FOIS freight-operations data for one zone into date-keyed tables",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file (environment variables still apply on top)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch past days for one or all endpoints
    Fetch {
        /// Number of past days to fetch, ending yesterday
        #[arg(short, long, allow_hyphen_values = true)]
        days: String,

        /// Endpoint name, table name or 1-based index (default: all)
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Show row counts and latest dates of the destination tables
    Status,

    /// List supported endpoints
    Endpoints,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Loading config never touches the network; errors surface in the commands that need it
    let config = load_config(cli.config.as_deref());

    // Initialize tracing/logging
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let format = cli.log_format.as_deref().unwrap_or(&logging.format);
    setup_tracing(format, &logging, cli.verbose)?;

    tracing::debug!("foisync starting");

    match cli.command {
        Commands::Fetch { days, endpoint } => {
            tracing::info!(
                days = %days,
                endpoint = ?endpoint,
                "Starting fetch command"
            );
            commands::fetch(config, &days, endpoint.as_deref()).await?;
        }

        Commands::Status => {
            commands::status(config?)?;
        }

        Commands::Endpoints => {
            commands::endpoints();
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    Ok(config)
}

fn setup_tracing(format: &str, logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("foisync=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("foisync={},warn", logging.level))
        })
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
    }

    Ok(())
}
