use anyhow::Context;
use azmon::cli::{Cli, Command};
use azmon::commands;
use azmon::config::{AppConfig, load_config};
use azmon::error::AppError;
use azmon::logger::{export_failure, setup_logger};
use clap::Parser;
use provisioner::telemetry::{AppLogger, ComponentLogger, TelemetryError};
use provisioner::utils::EnvUtils;
use std::collections::HashMap;

const TELEMETRY_COMPONENT: &str = "azmon";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())
        .into_result()
        .context("Failed to load configuration")?;
    // `init` writes a fresh config, so a broken one must not block it
    if !matches!(cli.command, Command::Init(_)) {
        config.validate().map_err(AppError::InvalidConfig)?;
    }

    let telemetry = telemetry_sink(&config)?;
    setup_logger(config.logging(), cli.verbose, telemetry)?;
    log::debug!("Running {:?}", cli.command);

    let result = commands::execute(&cli.command, &config).await;

    if let Some(app) = AppLogger::global() {
        if let Err(e) = &result {
            export_failure(app, TELEMETRY_COMPONENT, dimensions(), e);
        }
        if let Err(e) = app.flush().await {
            eprintln!("Failed to flush Application Insights telemetry: {e}");
        }
    }

    result.map_err(Into::into)
}

/// Builds the Application Insights sink for the console logger.
///
/// A missing instrumentation key only disables the sink. An invalid key or
/// connection string is an error.
fn telemetry_sink(config: &AppConfig) -> Result<Option<ComponentLogger>, AppError> {
    let telemetry = config.telemetry();
    if !telemetry.logging_enabled {
        return Ok(None);
    }
    match telemetry.resolve_target() {
        Ok(_) => {}
        Err(TelemetryError::KeyNotSet) => {
            eprintln!("{}, continuing without it", TelemetryError::KeyNotSet);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let app = AppLogger::instance(telemetry.clone(), reqwest::Client::new())?;
    Ok(Some(app.get_logger(TELEMETRY_COMPONENT, dimensions())))
}

fn dimensions() -> HashMap<String, String> {
    HashMap::from([
        ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ("host".to_string(), host_name()),
    ])
}

fn host_name() -> String {
    EnvUtils::first_set(&["HOSTNAME", "COMPUTERNAME"])
        .map(|(_, name)| name)
        .unwrap_or_else(|| "unknown".to_string())
}
