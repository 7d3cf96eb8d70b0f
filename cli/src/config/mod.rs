use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod app;
pub mod limits;
pub mod validation;

pub use app::{AppConfig, AzureConfig, DatabaseConfig, DeploymentConfig};
pub use validation::{ConfigLoadResult, ConfigValidationError};

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Loads `config.toml` (or `path`) with environment overrides.
///
/// Environment variables use `__` to separate sections, for example
/// `DATABASE__PASSWORD` or `AZURE__SUBSCRIPTION_ID`. A `.env` file in the
/// working directory is read first. The default file may be absent; an
/// explicitly given one must exist.
pub fn load_config(path: Option<&Path>) -> ConfigLoadResult {
    dotenv::dotenv().ok();
    let env_source = Environment::default().separator("__");

    let file_source = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config = match Config::builder()
        .add_source(file_source)
        .add_source(env_source) // environment entries override file values
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            return ConfigLoadResult::LoadError(format!(
                "Configuration loading failed: {e}. Please check your config.toml file and environment variables."
            ));
        }
    };

    match config.try_deserialize::<AppConfig>() {
        Ok(app_config) => ConfigLoadResult::Success(Box::new(app_config)),
        Err(e) => ConfigLoadResult::DeserializeError(format!("Failed to deserialize config: {e}")),
    }
}

/// Console and file logging settings
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}
