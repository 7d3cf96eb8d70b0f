use super::connection_string::IngestionTarget;
use super::errors::TelemetryError;
use crate::utils::env::EnvUtils;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const INSTRUMENTATION_KEY_ENV: &str = "APPINSIGHTS_INSTRUMENTATION_KEY";
pub const CONNECTION_STRING_ENV: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";
pub const DEFAULT_EXPORT_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Settings for the Application Insights logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub logging_enabled: bool,
    pub app_insights_key: Option<String>,
    /// Takes precedence over `app_insights_key` when set
    pub connection_string: Option<String>,
    pub export_interval_secs: u64,
    pub max_batch_size: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            logging_enabled: true,
            app_insights_key: None,
            connection_string: None,
            export_interval_secs: DEFAULT_EXPORT_INTERVAL_SECS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl TelemetryConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn export_interval(&self) -> Duration {
        Duration::from_secs(self.export_interval_secs.max(1))
    }

    /// Resolves where telemetry is sent.
    ///
    /// Order: configured connection string, configured key, then the
    /// `APPLICATIONINSIGHTS_CONNECTION_STRING` and
    /// `APPINSIGHTS_INSTRUMENTATION_KEY` environment variables.
    pub fn resolve_target(&self) -> Result<IngestionTarget, TelemetryError> {
        if let Some(cs) = non_empty(&self.connection_string) {
            return IngestionTarget::from_connection_string(cs);
        }
        if let Some(key) = non_empty(&self.app_insights_key) {
            return IngestionTarget::from_instrumentation_key(key);
        }
        if let Some(cs) = EnvUtils::get_optional_var(CONNECTION_STRING_ENV) {
            return IngestionTarget::from_connection_string(&cs);
        }
        match EnvUtils::get_optional_var(INSTRUMENTATION_KEY_ENV) {
            Some(key) => IngestionTarget::from_instrumentation_key(&key),
            None => Err(TelemetryError::KeyNotSet),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
