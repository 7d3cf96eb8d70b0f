//! Validated access to environment variables.
//!
//! Values are trimmed and an empty value counts as unset, so a blank line in
//! a `.env` file never reaches a subscription id or instrumentation key.

use std::env::VarError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EnvVarError {
    #[error("Environment variable '{0}' is not set")]
    NotFound(String),

    #[error("Environment variable '{0}' is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("Environment variable '{0}' is set but empty")]
    Empty(String),
}

/// Lookups used for settings that may come from the environment.
///
/// ```no_run
/// use provisioner::utils::EnvUtils;
///
/// let subscription = EnvUtils::get_optional_var("AZURE_SUBSCRIPTION_ID");
/// let key = EnvUtils::get_validated_var("APPINSIGHTS_INSTRUMENTATION_KEY")?;
/// # Ok::<(), provisioner::utils::EnvVarError>(())
/// ```
pub struct EnvUtils;

impl EnvUtils {
    /// Reads a variable and returns its trimmed value.
    pub fn get_validated_var(name: &str) -> Result<String, EnvVarError> {
        let value = std::env::var(name).map_err(|e| match e {
            VarError::NotPresent => EnvVarError::NotFound(name.to_string()),
            VarError::NotUnicode(_) => EnvVarError::InvalidUtf8(name.to_string()),
        })?;

        match value.trim() {
            "" => Err(EnvVarError::Empty(name.to_string())),
            trimmed => Ok(trimmed.to_string()),
        }
    }

    pub fn get_optional_var(name: &str) -> Option<String> {
        match Self::get_validated_var(name) {
            Ok(value) => Some(value),
            Err(EnvVarError::NotFound(_)) => None,
            Err(e) => {
                log::debug!("Ignoring {e}");
                None
            }
        }
    }

    /// The first of `names` holding a usable value.
    pub fn first_set<'a>(names: &[&'a str]) -> Option<(&'a str, String)> {
        names
            .iter()
            .find_map(|name| Self::get_optional_var(name).map(|value| (*name, value)))
    }
}
