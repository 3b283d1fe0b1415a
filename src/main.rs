//! filtergate - content filtering gateway
//!
//! Async gateway service enforcing tenant-defined content policy

use clap::Parser;
use filtergate::config::Config;
use filtergate::server;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Content filtering and policy enforcement gateway
#[derive(Parser)]
#[command(name = "gateway", version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config/gateway.yaml", env = "FILTERGATE_CONFIG")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Initialize logging system
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                "Configuration file loading failed, using defaults: {}",
                e
            );
            Config::default()
        }
    }
    .apply_env();

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match server::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
