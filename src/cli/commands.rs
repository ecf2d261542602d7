//! CLI command implementations
//!
//! Boot order: configuration, data file, operator registry, then the
//! HTTP listener on a fresh tokio runtime.

use std::path::Path;

use crate::config::ServiceConfig;
use crate::filter::OperatorRegistry;
use crate::observability::{Event, Logger};
use crate::rest_api::{ApiServer, ObjectsHandler};

use super::args::Command;
use super::data::LoadedData;
use super::errors::{CliError, CliResult};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, data } => serve(&config, &data),
        Command::Check { config, data } => check(&config, &data).map(|_| ()),
    }
}

/// Load and validate configuration and data without serving
pub fn check(config_path: &Path, data_path: &Path) -> CliResult<(ServiceConfig, LoadedData)> {
    let config = ServiceConfig::load(config_path)?;
    Logger::info(
        Event::ConfigLoaded,
        &[
            ("path", &config_path.display().to_string()),
            ("port", &config.http.port.to_string()),
        ],
    );

    let data = LoadedData::load(data_path)?;
    Logger::info(
        Event::DataLoaded,
        &[
            ("instances", &data.catalog.len().to_string()),
            ("path", &data_path.display().to_string()),
        ],
    );

    Ok((config, data))
}

/// Serve the listing API until the listener fails
pub fn serve(config_path: &Path, data_path: &Path) -> CliResult<()> {
    let (config, data) = check(config_path, data_path)?;

    let handler = ObjectsHandler::new(
        data.catalog,
        data.executor,
        OperatorRegistry::builtin(),
        config,
    );
    let server = ApiServer::new(handler);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::BootFailed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::BootFailed(format!("HTTP server failed: {}", e)))
    })
}
