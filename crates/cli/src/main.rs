use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::Parser;
use procure_cli::Cli;
use procure_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

/// Logs go to stderr; stdout carries the command's JSON result.
fn init_logging(config: &AppConfig) -> Result<()> {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!("failed to install log subscriber: {error}"))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    // A broken config is reported by the command itself; logging runs on
    // defaults in that case.
    let options = LoadOptions { config_path: cli.config.clone(), ..LoadOptions::default() };
    let config = AppConfig::load(options).unwrap_or_default();
    init_logging(&config)?;
    Ok(procure_cli::run(cli))
}
