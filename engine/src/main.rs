// Subtrack
// Main entry point for the subtrack binary

use clap::Parser;
use subtrack_engine::cli::{Cli, Command};
use subtrack_engine::config::Config;
use subtrack_engine::handlers::{
    handle_doctor, handle_guide, handle_normalize, handle_reminders, handle_serve, OutputFormat,
};
use subtrack_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // RUST_LOG > --log > core.log_level
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    tracing::info!("Subtrack v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve { host, port } => handle_serve(&config, host, port, format).await,

        Command::Reminders { date } => {
            tracing::info!("Checking reminders...");
            handle_reminders(&config, date, format).await
        }

        Command::Guide { service, refresh } => {
            tracing::info!("Looking up cancellation guide for {}", service);
            handle_guide(&config, service, refresh, format).await
        }

        Command::Normalize { file } => handle_normalize(file, format).await,

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }
    }
}
