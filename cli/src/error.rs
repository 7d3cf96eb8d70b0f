use crate::config::ConfigValidationError;
use provisioner::auth::AuthError;
use provisioner::telemetry::TelemetryError;
use provisioner::ProvisionError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the `azmon` commands.
///
/// # Error Categories
///
/// ## Setup
/// - [`Config`] - configuration could not be loaded or parsed
/// - [`InvalidConfig`] - configuration loaded but failed validation
/// - [`Logger`] - the log dispatcher could not be installed
///
/// ## Running a command
/// - [`Provision`] - a provisioning step failed
/// - [`Auth`] - no authentication provider could be created
/// - [`Telemetry`] - the Application Insights logger failed
/// - [`Io`] - reading or writing a local file failed
/// - [`Unresolved`] - generated files still contain placeholders
///
/// [`Config`]: AppError::Config
/// [`InvalidConfig`]: AppError::InvalidConfig
/// [`Logger`]: AppError::Logger
/// [`Provision`]: AppError::Provision
/// [`Auth`]: AppError::Auth
/// [`Telemetry`]: AppError::Telemetry
/// [`Io`]: AppError::Io
/// [`Unresolved`]: AppError::Unresolved
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Configuration validation failed:\n{}", format_validation(.0))]
    InvalidConfig(Vec<ConfigValidationError>),

    #[error("Logger Error: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Authentication Error: {0}")]
    Auth(#[from] AuthError),

    #[error("Telemetry Error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("I/O Error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unresolved placeholders remain: {}", .0.join(", "))]
    Unresolved(Vec<String>),
}

fn format_validation(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e.user_message()))
        .collect::<Vec<_>>()
        .join("\n")
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for command operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_listed() {
        let err = AppError::InvalidConfig(vec![
            ConfigValidationError::EmptyLocation,
            ConfigValidationError::NoEnvFiles,
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Configuration validation failed:"));
        assert_eq!(message.lines().count(), 3);
    }

    #[test]
    fn test_provision_errors_pass_through() {
        let err: AppError = ProvisionError::EmptyValue("{DBUSER}".to_string()).into();
        assert_eq!(err.to_string(), "Value for placeholder {DBUSER} is empty");
    }
}
