use super::config::TelemetryConfig;
use super::connection_string::IngestionTarget;
use super::envelope::Envelope;
use super::errors::TelemetryError;
use super::exporter::Exporter;
use super::tracer::{SpanContext, Tracer};
use log::kv::{self, Key, VisitSource};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

static APP_LOGGER: OnceLock<AppLogger> = OnceLock::new();

/// HTTP stack targets whose records are never exported, since exporting
/// them would produce more of the same records.
const TRANSPORT_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "rustls", "want", "mio"];

pub const DEFAULT_COMPONENT: &str = "AppLogger";

/// Process-wide Application Insights logger.
///
/// Holds the configuration and the single exporter that every
/// [`ComponentLogger`] hands its envelopes to.
pub struct AppLogger {
    config: TelemetryConfig,
    target: Option<IngestionTarget>,
    exporter: Option<Exporter>,
}

impl AppLogger {
    /// Creates a logger that is not registered as the process-wide instance.
    ///
    /// With `logging_enabled = false` no key is required and nothing is exported.
    pub fn new(config: TelemetryConfig, client: reqwest::Client) -> Result<Self, TelemetryError> {
        if !config.logging_enabled {
            return Ok(Self {
                config,
                target: None,
                exporter: None,
            });
        }

        let target = config.resolve_target()?;
        let exporter = Exporter::spawn(
            client,
            target.clone(),
            config.export_interval(),
            config.max_batch_size,
        )?;

        Ok(Self {
            config,
            target: Some(target),
            exporter: Some(exporter),
        })
    }

    /// Returns the process-wide logger, creating it on first use.
    ///
    /// Later calls return the first instance and ignore their arguments.
    pub fn instance(
        config: TelemetryConfig,
        client: reqwest::Client,
    ) -> Result<&'static AppLogger, TelemetryError> {
        if let Some(logger) = APP_LOGGER.get() {
            return Ok(logger);
        }
        let logger = Self::new(config, client)?;
        let _ = APP_LOGGER.set(logger);
        APP_LOGGER.get().ok_or(TelemetryError::ExporterStopped)
    }

    pub fn global() -> Option<&'static AppLogger> {
        APP_LOGGER.get()
    }

    pub fn is_enabled(&self) -> bool {
        self.exporter.is_some()
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn target(&self) -> Option<&IngestionTarget> {
        self.target.as_ref()
    }

    /// A logger whose records carry `component` as cloud role and
    /// `custom_dimensions` as default properties.
    pub fn get_logger(
        &self,
        component: &str,
        custom_dimensions: HashMap<String, String>,
    ) -> ComponentLogger {
        ComponentLogger {
            component: component.to_string(),
            level: self.config.level_filter(),
            default_dimensions: custom_dimensions.into_iter().collect(),
            instrumentation_key: self.instrumentation_key(),
            exporter: self.exporter.clone(),
        }
    }

    /// A tracer for `component`. With a `parent`, its spans join the
    /// parent's operation; otherwise each root span starts a new one.
    ///
    /// When export is disabled the tracer records nothing.
    pub fn get_tracer(&self, component: &str, parent: Option<&SpanContext>) -> Tracer {
        Tracer::new(
            component,
            self.instrumentation_key(),
            self.exporter.clone(),
            parent.cloned(),
        )
    }

    /// Uploads everything queued and returns how many envelopes were posted
    /// since the previous flush.
    pub async fn flush(&self) -> Result<usize, TelemetryError> {
        match &self.exporter {
            Some(exporter) => exporter.flush().await,
            None => Ok(0),
        }
    }

    fn instrumentation_key(&self) -> String {
        self.target
            .as_ref()
            .map(|t| t.instrumentation_key.clone())
            .unwrap_or_default()
    }
}

/// `log::Log` sink that turns records into Application Insights traces.
pub struct ComponentLogger {
    component: String,
    level: log::LevelFilter,
    default_dimensions: BTreeMap<String, String>,
    instrumentation_key: String,
    exporter: Option<Exporter>,
}

impl ComponentLogger {
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn level(&self) -> log::LevelFilter {
        self.level
    }

    /// Default dimensions overlaid with the record's own key-values.
    fn dimensions(&self, record: &log::Record<'_>) -> BTreeMap<String, String> {
        let mut dimensions = self.default_dimensions.clone();
        let mut collector = DimensionCollector(&mut dimensions);
        let _ = record.key_values().visit(&mut collector);
        dimensions
    }
}

impl log::Log for ComponentLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.exporter.is_some()
            && metadata.level() <= self.level
            && !is_transport_target(metadata.target())
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(exporter) = &self.exporter else {
            return;
        };

        let envelope = Envelope::message(
            &self.instrumentation_key,
            &self.component,
            chrono::Utc::now(),
            record.level(),
            record.args().to_string(),
            self.dimensions(record),
        );
        exporter.submit(envelope);
    }

    fn flush(&self) {
        if let Some(exporter) = &self.exporter {
            exporter.request_flush();
        }
    }
}

struct DimensionCollector<'a>(&'a mut BTreeMap<String, String>);

impl<'kvs> VisitSource<'kvs> for DimensionCollector<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: kv::Value<'kvs>) -> Result<(), kv::Error> {
        self.0.insert(key.as_str().to_string(), value.to_string());
        Ok(())
    }
}

fn is_transport_target(target: &str) -> bool {
    TRANSPORT_TARGETS.iter().any(|prefix| {
        target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}
