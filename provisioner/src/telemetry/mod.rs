//! Application Insights logging.
//!
//! [`AppLogger`] owns one background [`Exporter`]; every
//! [`ComponentLogger`] obtained from [`AppLogger::get_logger`] is a
//! `log::Log` implementation that tags its records with the component name
//! as cloud role and forwards them to that exporter. [`AppLogger::get_tracer`]
//! hands out [`Tracer`]s whose spans go through the same exporter as request
//! and dependency telemetry.

pub mod config;
pub mod connection_string;
pub mod envelope;
pub mod errors;
pub mod exporter;
pub mod logger;
pub mod tracer;

pub use config::TelemetryConfig;
pub use connection_string::{DEFAULT_INGESTION_ENDPOINT, IngestionTarget, validate_instrumentation_key};
pub use envelope::{BaseData, Envelope, SeverityLevel};
pub use errors::TelemetryError;
pub use exporter::Exporter;
pub use logger::{AppLogger, ComponentLogger, DEFAULT_COMPONENT};
pub use tracer::{Span, SpanContext, SpanKind, Tracer};
