use super::errors::TelemetryError;
use uuid::Uuid;

pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// Instrumentation key plus the endpoint telemetry is posted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionTarget {
    pub instrumentation_key: String,
    /// Base URL without a trailing slash
    pub endpoint: String,
}

impl IngestionTarget {
    pub fn from_instrumentation_key(key: &str) -> Result<Self, TelemetryError> {
        Ok(Self {
            instrumentation_key: validate_instrumentation_key(key)?,
            endpoint: DEFAULT_INGESTION_ENDPOINT.to_string(),
        })
    }

    /// Parses `InstrumentationKey=...;IngestionEndpoint=...`.
    ///
    /// Keys are matched case-insensitively and unknown keys are ignored.
    pub fn from_connection_string(value: &str) -> Result<Self, TelemetryError> {
        let mut key = None;
        let mut endpoint = None;

        for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, val) = part.split_once('=').ok_or_else(|| {
                TelemetryError::InvalidConnectionString(format!("'{part}' is not a key=value pair"))
            })?;
            match name.trim().to_ascii_lowercase().as_str() {
                "instrumentationkey" => key = Some(val.trim()),
                "ingestionendpoint" => endpoint = Some(val.trim()),
                _ => {}
            }
        }

        let key = key.ok_or_else(|| {
            TelemetryError::InvalidConnectionString("InstrumentationKey is missing".to_string())
        })?;
        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_INGESTION_ENDPOINT);
        if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            return Err(TelemetryError::InvalidConnectionString(format!(
                "IngestionEndpoint '{endpoint}' is not an http(s) URL"
            )));
        }

        Ok(Self {
            instrumentation_key: validate_instrumentation_key(key)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn track_url(&self) -> String {
        format!("{}/v2/track", self.endpoint)
    }
}

/// Accepts only the hyphenated 8-4-4-4-12 GUID form.
pub fn validate_instrumentation_key(key: &str) -> Result<String, TelemetryError> {
    let key = key.trim();
    if key.len() != 36 {
        return Err(TelemetryError::InvalidKey(key.to_string()));
    }
    Uuid::parse_str(key)
        .map(|_| key.to_ascii_lowercase())
        .map_err(|_| TelemetryError::InvalidKey(key.to_string()))
}
