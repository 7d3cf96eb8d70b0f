//! Installs the process-wide logger, so this file holds a single test.

use azmon::config::LoggingConfig;
use azmon::logger::setup_logger;
use provisioner::telemetry::{AppLogger, TelemetryConfig};
use std::collections::HashMap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "7a1d6f0e-3b2c-4e5f-8a9b-0c1d2e3f4a5b";

#[tokio::test]
async fn log_macros_reach_application_insights() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/track"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let telemetry = TelemetryConfig {
        connection_string: Some(format!(
            "InstrumentationKey={KEY};IngestionEndpoint={}",
            server.uri()
        )),
        log_level: "debug".to_string(),
        export_interval_secs: 60,
        ..Default::default()
    };
    let app = AppLogger::instance(telemetry, reqwest::Client::new()).unwrap();
    let sink = app.get_logger(
        "azmon",
        HashMap::from([("version".to_string(), "test".to_string())]),
    );
    // A quiet console must not cap what is exported
    let console: LoggingConfig = toml::from_str("level = \"warn\"").unwrap();
    setup_logger(&console, 0, Some(sink)).unwrap();

    log::info!(target: "azmon::deploy", "Resource group azmon-abc123 is ready");
    log::warn!(target: "azmon::deploy", "Parameters file has no {{SUFFIX}} token");
    log::debug!(target: "azmon::deploy", "Polling deployment state");
    log::trace!(target: "azmon::deploy", "below the telemetry level");
    log::info!(target: "reqwest::connect", "transport chatter");

    AppLogger::global().unwrap().flush().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let envelopes: Vec<serde_json::Value> = requests
        .iter()
        .flat_map(|r| {
            serde_json::from_slice::<Vec<serde_json::Value>>(&r.body).unwrap_or_default()
        })
        .collect();
    let messages: Vec<&str> = envelopes
        .iter()
        .filter_map(|e| e["data"]["baseData"]["message"].as_str())
        .collect();

    assert!(messages.contains(&"Resource group azmon-abc123 is ready"));
    assert!(messages.contains(&"Parameters file has no {SUFFIX} token"));
    assert!(messages.contains(&"Polling deployment state"));
    assert!(!messages.contains(&"below the telemetry level"));
    assert!(!messages.contains(&"transport chatter"));

    let warning = envelopes
        .iter()
        .find(|e| e["data"]["baseData"]["severityLevel"] == 2)
        .unwrap();
    assert_eq!(warning["iKey"], KEY);
    assert_eq!(warning["tags"]["ai.cloud.role"], "azmon");
    assert_eq!(warning["data"]["baseData"]["properties"]["version"], "test");
}
