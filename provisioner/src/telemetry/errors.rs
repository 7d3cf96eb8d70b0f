use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("ApplicationInsights Key is not set")]
    KeyNotSet,

    #[error("Invalid instrumentation key '{0}': expected a GUID")]
    InvalidKey(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("The telemetry exporter needs a running Tokio runtime")]
    NoRuntime,

    #[error("The telemetry exporter has stopped")]
    ExporterStopped,

    #[error("Telemetry export failed: {0}")]
    Export(String),

    #[error("No telemetry was accepted by the ingestion endpoint")]
    NothingExported,
}
