//! Application Insights ingestion payloads.
//!
//! Traces (`MessageData`), requests (`RequestData`) and dependencies
//! (`RemoteDependencyData`) are produced. See the ingestion schema at
//! <https://github.com/microsoft/ApplicationInsights-dotnet/tree/main/BASE/Schema>.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const MESSAGE_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.Message";
pub const REQUEST_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.Request";
pub const DEPENDENCY_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.RemoteDependency";
pub const TAG_CLOUD_ROLE: &str = "ai.cloud.role";
pub const TAG_CLOUD_ROLE_INSTANCE: &str = "ai.cloud.roleInstance";
pub const TAG_OPERATION_ID: &str = "ai.operation.id";
pub const TAG_OPERATION_PARENT_ID: &str = "ai.operation.parentId";

/// Application Insights severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum SeverityLevel {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl From<SeverityLevel> for u8 {
    fn from(level: SeverityLevel) -> Self {
        match level {
            SeverityLevel::Verbose => 0,
            SeverityLevel::Information => 1,
            SeverityLevel::Warning => 2,
            SeverityLevel::Error => 3,
            SeverityLevel::Critical => 4,
        }
    }
}

impl From<log::Level> for SeverityLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => SeverityLevel::Error,
            log::Level::Warn => SeverityLevel::Warning,
            log::Level::Info => SeverityLevel::Information,
            log::Level::Debug | log::Level::Trace => SeverityLevel::Verbose,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub ver: u8,
    pub message: String,
    pub severity_level: SeverityLevel,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub ver: u8,
    pub id: String,
    pub name: String,
    /// `d.hh:mm:ss.fff`, see [`format_duration`]
    pub duration: String,
    pub response_code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDependencyData {
    pub ver: u8,
    pub id: String,
    pub name: String,
    pub duration: String,
    pub result_code: String,
    pub success: bool,
    #[serde(rename = "type")]
    pub dependency_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BaseData {
    Message(MessageData),
    Request(RequestData),
    RemoteDependency(RemoteDependencyData),
}

impl BaseData {
    fn base_type(&self) -> &'static str {
        match self {
            BaseData::Message(_) => "MessageData",
            BaseData::Request(_) => "RequestData",
            BaseData::RemoteDependency(_) => "RemoteDependencyData",
        }
    }

    fn envelope_name(&self) -> &'static str {
        match self {
            BaseData::Message(_) => MESSAGE_ENVELOPE_NAME,
            BaseData::Request(_) => REQUEST_ENVELOPE_NAME,
            BaseData::RemoteDependency(_) => DEPENDENCY_ENVELOPE_NAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub base_type: &'static str,
    pub base_data: BaseData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub name: &'static str,
    pub time: String,
    #[serde(rename = "iKey")]
    pub instrumentation_key: String,
    pub tags: BTreeMap<String, String>,
    pub data: Data,
}

impl Envelope {
    /// Wraps `base_data` in an envelope tagged with the component as cloud role.
    pub fn new(
        instrumentation_key: &str,
        component: &str,
        time: DateTime<Utc>,
        base_data: BaseData,
    ) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert(TAG_CLOUD_ROLE.to_string(), component.to_string());
        tags.insert(TAG_CLOUD_ROLE_INSTANCE.to_string(), component.to_string());

        Self {
            name: base_data.envelope_name(),
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
            instrumentation_key: instrumentation_key.to_string(),
            tags,
            data: Data {
                base_type: base_data.base_type(),
                base_data,
            },
        }
    }

    /// Builds a trace envelope.
    pub fn message(
        instrumentation_key: &str,
        component: &str,
        time: DateTime<Utc>,
        level: log::Level,
        message: String,
        properties: BTreeMap<String, String>,
    ) -> Self {
        Self::new(
            instrumentation_key,
            component,
            time,
            BaseData::Message(MessageData {
                ver: 2,
                message,
                severity_level: level.into(),
                properties,
            }),
        )
    }

    /// Sets the operation correlation tags.
    pub fn with_operation(mut self, operation_id: &str, parent_id: Option<&str>) -> Self {
        self.tags
            .insert(TAG_OPERATION_ID.to_string(), operation_id.to_string());
        if let Some(parent_id) = parent_id {
            self.tags
                .insert(TAG_OPERATION_PARENT_ID.to_string(), parent_id.to_string());
        }
        self
    }
}

/// Formats a duration the way the ingestion endpoint expects it.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let secs = millis / 1000;
    format!(
        "{}.{:02}:{:02}:{:02}.{:03}",
        secs / 86_400,
        secs / 3600 % 24,
        secs / 60 % 60,
        secs % 60,
        millis % 1000
    )
}
