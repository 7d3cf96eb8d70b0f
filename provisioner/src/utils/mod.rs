//! Shared helpers.
//!
//! [`EnvUtils`] backs the environment fallbacks used across the crate, such
//! as `APPINSIGHTS_INSTRUMENTATION_KEY` for the telemetry logger.

pub mod env;

pub use env::{EnvUtils, EnvVarError};
