use crate::config::LoggingConfig;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use provisioner::telemetry::{AppLogger, ComponentLogger};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs::OpenOptions;

/// Resolves the console level from config and the number of `-v` flags.
pub fn level_filter(config: &LoggingConfig, verbosity: u8) -> LevelFilter {
    let configured = match config.level().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info, // Default to Info for any other value
    };
    match verbosity {
        0 => configured,
        1 => configured.max(LevelFilter::Debug),
        _ => LevelFilter::Trace,
    }
}

/// Installs the global logger.
///
/// Records go to stderr, to the configured log file when one is set, and to
/// Application Insights when `telemetry` is given. The console level applies
/// to stderr and the file; Application Insights uses the telemetry level.
pub fn setup_logger(
    config: &LoggingConfig,
    verbosity: u8,
    telemetry: Option<ComponentLogger>,
) -> Result<(), log::SetLoggerError> {
    let log_level = level_filter(config, verbosity);
    let export_level = telemetry
        .as_ref()
        .map_or(LevelFilter::Off, ComponentLogger::level);

    let colors = ColoredLevelConfig::new()
        .trace(Color::BrightBlack)
        .debug(Color::BrightBlue)
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level(log_level.max(export_level))
        // The HTTP stack is noisy below warn
        .level_for("hyper", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("rustls", LevelFilter::Warn)
        .chain(console);

    let mut file_note = None;
    if let Some(file_path) = config.file() {
        match OpenOptions::new().create(true).append(true).open(file_path) {
            Ok(file) => {
                dispatch = dispatch.chain(
                    fern::Dispatch::new()
                        .level(log_level)
                        .format(|out, message, record| {
                            out.finish(format_args!(
                                "[{} {} {}] {}",
                                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                                record.level(),
                                record.target(),
                                message
                            ))
                        })
                        .chain(file),
                );
                file_note = Some(format!("Logging to file: {file_path}"));
            }
            Err(e) => {
                eprintln!("Warning: Failed to open log file '{file_path}': {e}");
                eprintln!("Continuing without file logging.");
            }
        }
    }

    let app_insights = telemetry.as_ref().map(|logger| logger.component().to_string());
    if let Some(logger) = telemetry {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(export_level)
                .chain(Box::new(logger) as Box<dyn log::Log>),
        );
    }

    dispatch.apply()?;

    log::debug!("Logger initialized with level: {log_level}");
    if let Some(note) = file_note {
        log::debug!("{note}");
    }
    if let Some(component) = app_insights {
        log::debug!("Forwarding logs to Application Insights as '{component}'");
    }
    Ok(())
}

/// Sends a command failure to Application Insights without printing it.
pub fn export_failure(
    app: &AppLogger,
    component: &str,
    dimensions: HashMap<String, String>,
    error: &dyn Display,
) {
    let sink = app.get_logger(component, dimensions);
    log::Log::log(
        &sink,
        &log::Record::builder()
            .args(format_args!("{error}"))
            .level(log::Level::Error)
            .target(module_path!())
            .build(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisioner::telemetry::TelemetryConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_failure_is_exported_as_error_trace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/track"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let telemetry = TelemetryConfig {
            connection_string: Some(format!(
                "InstrumentationKey=11111111-2222-3333-4444-555555555555;IngestionEndpoint={}",
                server.uri()
            )),
            export_interval_secs: 60,
            ..Default::default()
        };
        let app = AppLogger::new(telemetry, reqwest::Client::new()).unwrap();

        export_failure(
            &app,
            "azmon",
            HashMap::from([("version".to_string(), "test".to_string())]),
            &"Unresolved placeholders remain: {SUFFIX}",
        );
        assert_eq!(app.flush().await.unwrap(), 1);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(
            body[0]["data"]["baseData"]["message"],
            "Unresolved placeholders remain: {SUFFIX}"
        );
        assert_eq!(body[0]["data"]["baseData"]["severityLevel"], 3);
        assert_eq!(body[0]["data"]["baseData"]["properties"]["version"], "test");
    }

    fn config(level: &str) -> LoggingConfig {
        toml::from_str(&format!("level = \"{level}\"")).unwrap()
    }

    #[test]
    fn test_level_from_config() {
        assert_eq!(level_filter(&config("warn"), 0), LevelFilter::Warn);
        assert_eq!(level_filter(&config("nonsense"), 0), LevelFilter::Info);
        assert_eq!(level_filter(&LoggingConfig::default(), 0), LevelFilter::Info);
    }

    #[test]
    fn test_verbosity_raises_level() {
        assert_eq!(level_filter(&config("warn"), 1), LevelFilter::Debug);
        assert_eq!(level_filter(&config("trace"), 1), LevelFilter::Trace);
        assert_eq!(level_filter(&config("error"), 2), LevelFilter::Trace);
    }
}
