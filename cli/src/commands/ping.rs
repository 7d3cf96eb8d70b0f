use crate::cli::PingArgs;
use crate::config::AppConfig;
use crate::error::AppResult;
use log::{LevelFilter, Log};
use provisioner::telemetry::{AppLogger, TelemetryConfig, TelemetryError};
use std::collections::HashMap;
use uuid::Uuid;

pub const PING_COMPONENT: &str = "azmon-ping";

/// Sends one trace through a dedicated Application Insights logger and waits
/// for the upload, so a bad key or endpoint shows up as an error.
pub async fn run(args: &PingArgs, config: &AppConfig) -> AppResult<()> {
    let telemetry = ping_config(args, config.telemetry());
    let target = telemetry.resolve_target()?;
    let app = AppLogger::new(telemetry, reqwest::Client::new())?;

    let ping_id = Uuid::new_v4().to_string();
    let sink = app.get_logger(
        PING_COMPONENT,
        HashMap::from([("command".to_string(), "ping".to_string())]),
    );
    let kvs = ("ping_id", ping_id.as_str());
    sink.log(
        &log::Record::builder()
            .args(format_args!("{}", args.message))
            .level(log::Level::Info)
            .target(module_path!())
            .key_values(&kvs)
            .build(),
    );
    if app.flush().await? == 0 {
        return Err(TelemetryError::NothingExported.into());
    }

    println!(
        "Sent '{}' to {} (ping_id {ping_id})",
        args.message,
        target.track_url()
    );
    Ok(())
}

/// Export is always on for a ping, at info or below, whatever the config says.
fn ping_config(args: &PingArgs, configured: &TelemetryConfig) -> TelemetryConfig {
    let mut config = configured.clone();
    config.logging_enabled = true;
    if config.level_filter() < LevelFilter::Info {
        config.log_level = "info".to_string();
    }
    if let Some(cs) = &args.connection_string {
        config.connection_string = Some(cs.clone());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY: &str = "11111111-2222-3333-4444-555555555555";

    fn config_with(telemetry: &str) -> AppConfig {
        toml::from_str(&format!("[telemetry]\n{telemetry}")).unwrap()
    }

    #[tokio::test]
    async fn test_ping_is_sent_when_configured_level_is_warn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/track"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let config = config_with(&format!(
            "log_level = \"warn\"\nconnection_string = \"InstrumentationKey={KEY};IngestionEndpoint={}\"",
            server.uri()
        ));

        run(&PingArgs::default(), &config).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body[0]["tags"]["ai.cloud.role"], PING_COMPONENT);
        assert_eq!(body[0]["data"]["baseData"]["properties"]["command"], "ping");
    }

    #[tokio::test]
    async fn test_ping_fails_when_endpoint_rejects_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid instrumentation key"))
            .mount(&server)
            .await;
        let args = PingArgs {
            connection_string: Some(format!(
                "InstrumentationKey={KEY};IngestionEndpoint={}",
                server.uri()
            )),
            ..Default::default()
        };

        let err = run(&args, &AppConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid instrumentation key"));
    }

    #[test]
    fn test_quiet_level_is_raised_to_info() {
        let configured = TelemetryConfig {
            log_level: "error".to_string(),
            ..Default::default()
        };
        assert_eq!(
            ping_config(&PingArgs::default(), &configured).level_filter(),
            LevelFilter::Info
        );

        let configured = TelemetryConfig {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(
            ping_config(&PingArgs::default(), &configured).level_filter(),
            LevelFilter::Debug
        );
    }

    #[test]
    fn test_cli_connection_string_overrides_config() {
        let configured = TelemetryConfig {
            logging_enabled: false,
            app_insights_key: Some("11111111-2222-3333-4444-555555555555".to_string()),
            ..Default::default()
        };
        let args = PingArgs {
            connection_string: Some(
                "InstrumentationKey=aaaaaaaa-2222-3333-4444-555555555555".to_string(),
            ),
            ..Default::default()
        };

        let config = ping_config(&args, &configured);
        assert!(config.logging_enabled);
        assert_eq!(
            config.resolve_target().unwrap().instrumentation_key,
            "aaaaaaaa-2222-3333-4444-555555555555"
        );
    }
}
