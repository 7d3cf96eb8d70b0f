use std::path::PathBuf;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("azure.location is empty")]
    EmptyLocation,
    #[error("Invalid suffix_length: {configured} (min: {min_limit}, max: {max_limit})")]
    SuffixLength {
        configured: usize,
        min_limit: usize,
        max_limit: usize,
    },
    #[error("Invalid suffix '{value}': {reason}")]
    Suffix { value: String, reason: String },
    #[error("Invalid polling: interval {interval_secs}s, max wait {max_wait_secs}s")]
    Polling {
        interval_secs: u64,
        max_wait_secs: u64,
    },
    #[error("No env_files configured")]
    NoEnvFiles,
    #[error("Env file output {0} is configured more than once")]
    DuplicateOutput(PathBuf),
    #[error("Env file output {0} is also a template")]
    OutputOverwritesTemplate(PathBuf),
    #[error("Missing {field} for {method} authentication")]
    MissingAuthField {
        method: &'static str,
        field: &'static str,
    },
    #[error("Invalid log level '{0}'")]
    LogLevel(String),
    #[error("Invalid management_url '{0}'")]
    ManagementUrl(String),
    #[error("database.{0} is empty")]
    MissingDatabaseField(&'static str),
}

impl ConfigValidationError {
    /// One-line message pointing at the setting to change.
    pub fn user_message(&self) -> String {
        match self {
            ConfigValidationError::EmptyLocation => {
                "Location is empty. Set azure.location in config.toml (e.g. \"westeurope\") or pass --location.".to_string()
            }
            ConfigValidationError::SuffixLength {
                configured,
                min_limit,
                max_limit,
            } => format!(
                "Suffix length {configured} is out of range. Set deployment.suffix_length to a value between {min_limit} and {max_limit}."
            ),
            ConfigValidationError::Suffix { value, reason } => format!(
                "Suffix '{value}' is not usable: {reason}. Fix deployment.suffix or remove it to generate one."
            ),
            ConfigValidationError::Polling {
                interval_secs,
                max_wait_secs,
            } => format!(
                "Polling every {interval_secs}s for at most {max_wait_secs}s is not possible. deployment.poll_interval_secs must be at least 1 and below deployment.max_wait_secs."
            ),
            ConfigValidationError::NoEnvFiles => {
                "No environment files configured. Add at least one [[env_files]] entry with template and output.".to_string()
            }
            ConfigValidationError::DuplicateOutput(path) => format!(
                "{} is the output of more than one [[env_files]] entry. Give each entry its own output.",
                path.display()
            ),
            ConfigValidationError::OutputOverwritesTemplate(path) => format!(
                "{} is both a template and an output. Rendering would destroy the template.",
                path.display()
            ),
            ConfigValidationError::MissingAuthField { method, field } => format!(
                "azure_ad.{field} is required when azure_ad.auth_method is '{method}'."
            ),
            ConfigValidationError::LogLevel(level) => format!(
                "Log level '{level}' is unknown. Use one of: off, error, warn, info, debug, trace."
            ),
            ConfigValidationError::ManagementUrl(url) => format!(
                "azure.management_url '{url}' must be an http(s) URL."
            ),
            ConfigValidationError::MissingDatabaseField(field) => format!(
                "database.{field} is empty. Set it in config.toml or via DATABASE__{} in the environment.",
                field.to_ascii_uppercase()
            ),
        }
    }
}

/// Configuration loading result
pub enum ConfigLoadResult {
    Success(Box<super::AppConfig>),
    LoadError(String),
    DeserializeError(String),
}

impl ConfigLoadResult {
    pub fn into_result(self) -> crate::error::AppResult<super::AppConfig> {
        match self {
            ConfigLoadResult::Success(config) => Ok(*config),
            ConfigLoadResult::LoadError(msg) | ConfigLoadResult::DeserializeError(msg) => {
                Err(crate::error::AppError::Config(msg))
            }
        }
    }
}
