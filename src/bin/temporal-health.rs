use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use service_helpers::config::{load_config, Config};
use service_helpers::errors::{handle_fatal_error, ExitError, FatalError};
use service_helpers::lifecycle::shutdown_signal;
use service_helpers::observability::Logger;
use service_helpers::temporal::{connect_with, spawn_health_check, ClientOptions, ServiceProbe};

#[derive(Parser)]
#[command(name = "temporal-health")]
#[command(about = "Connect to Temporal and expose its health on GET /health", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `logging.level` from the config file.
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    if let Err(e) = Logger::init(&config.logging) {
        eprintln!("failed to initialise logging: {e}");
        std::process::exit(1);
    }

    std::process::exit(handle_fatal_error(run(config).await));
}

async fn run(config: Config) -> Result<(), ExitError> {
    let temporal = config.temporal;
    let connection = connect_with(ClientOptions::default(), temporal.client_options())
        .await
        .map_err(|e| {
            let host_port = temporal.host_port.clone();
            FatalError::new("Unable to create Temporal client")
                .with_cause(e)
                .with_params(move |event| event.str("host_port", host_port.clone()))
        })?;

    let probe = Arc::new(ServiceProbe::new(connection, temporal.health_service));
    let health = spawn_health_check(temporal.health_address, probe);

    shutdown_signal().await;
    health.abort();
    Ok(())
}
