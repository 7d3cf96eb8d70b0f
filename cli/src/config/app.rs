use super::limits::*;
use super::validation::ConfigValidationError;
use super::LoggingConfig;
use provisioner::auth::{AuthType, AzureAdAuthConfig};
use provisioner::deployer::{
    DEFAULT_INSIGHTS_NAME, DEFAULT_INSIGHTS_OUTPUT, DEFAULT_RESOURCE_GROUP,
    DEFAULT_STORAGE_ACCOUNT_NAME, DEFAULT_STORAGE_OUTPUT, DeploymentPlan,
};
use provisioner::management::{AZURE_MANAGEMENT_URL, DeploymentPolling};
use provisioner::suffix::{DEFAULT_SUFFIX_LENGTH, MAX_SUFFIX_LENGTH, Suffix};
use provisioner::telemetry::TelemetryConfig;
use provisioner::template::EnvFileSpec;
use provisioner::utils::EnvUtils;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

pub const SUBSCRIPTION_ID_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    azure: AzureConfig,
    #[serde(default)]
    azure_ad: AzureAdAuthConfig,
    #[serde(default)]
    deployment: DeploymentConfig,
    #[serde(default)]
    database: DatabaseConfig,
    #[serde(default = "default_env_files")]
    env_files: Vec<EnvFileSpec>,
    #[serde(default)]
    telemetry: TelemetryConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            azure: AzureConfig::default(),
            azure_ad: AzureAdAuthConfig::default(),
            deployment: DeploymentConfig::default(),
            database: DatabaseConfig::default(),
            env_files: default_env_files(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Checks everything every command relies on.
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if self.azure.location.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyLocation);
        }

        if let Some(url) = &self.azure.management_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                errors.push(ConfigValidationError::ManagementUrl(url.clone()));
            }
        }

        let length = self.deployment.suffix_length;
        if !(MIN_SUFFIX_LENGTH..=MAX_SUFFIX_LENGTH).contains(&length) {
            errors.push(ConfigValidationError::SuffixLength {
                configured: length,
                min_limit: MIN_SUFFIX_LENGTH,
                max_limit: MAX_SUFFIX_LENGTH,
            });
        }

        if let Some(value) = self.deployment.suffix.as_deref() {
            if let Err(e) = Suffix::parse(value) {
                errors.push(ConfigValidationError::Suffix {
                    value: value.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        let interval = self.deployment.poll_interval_secs;
        let max_wait = self.deployment.max_wait_secs;
        if interval < MIN_POLL_INTERVAL_SECS || interval >= max_wait || max_wait > MAX_WAIT_LIMIT_SECS
        {
            errors.push(ConfigValidationError::Polling {
                interval_secs: interval,
                max_wait_secs: max_wait,
            });
        }

        errors.extend(self.validate_env_files());
        errors.extend(self.validate_auth());

        if self.logging.level().parse::<log::LevelFilter>().is_err() {
            errors.push(ConfigValidationError::LogLevel(
                self.logging.level().to_string(),
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Adds the checks that only matter when the env files are actually written.
    pub fn validate_for_deploy(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = self.validate().err().unwrap_or_default();
        if self.database.user.trim().is_empty() {
            errors.push(ConfigValidationError::MissingDatabaseField("user"));
        }
        if self.database.password.trim().is_empty() {
            errors.push(ConfigValidationError::MissingDatabaseField("password"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_env_files(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        if self.env_files.is_empty() {
            errors.push(ConfigValidationError::NoEnvFiles);
        }

        let templates: HashSet<&PathBuf> = self.env_files.iter().map(|f| &f.template).collect();
        let mut outputs = HashSet::new();
        for file in &self.env_files {
            if !outputs.insert(&file.output) {
                errors.push(ConfigValidationError::DuplicateOutput(file.output.clone()));
            }
            if templates.contains(&file.output) {
                errors.push(ConfigValidationError::OutputOverwritesTemplate(
                    file.output.clone(),
                ));
            }
        }
        errors
    }

    fn validate_auth(&self) -> Vec<ConfigValidationError> {
        let method = match self.azure_ad.auth_method {
            AuthType::AzureCli => return Vec::new(),
            AuthType::DeviceCode => "device_code",
            AuthType::ClientCredentials => "client_credentials",
        };

        let mut required = vec![
            ("tenant_id", &self.azure_ad.tenant_id),
            ("client_id", &self.azure_ad.client_id),
        ];
        if self.azure_ad.auth_method == AuthType::ClientCredentials {
            required.push(("client_secret", &self.azure_ad.client_secret));
        }

        required
            .into_iter()
            .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .map(|(field, _)| ConfigValidationError::MissingAuthField { method, field })
            .collect()
    }

    /// Builds the run description from the loaded settings.
    ///
    /// The subscription falls back to `AZURE_SUBSCRIPTION_ID` when not configured.
    pub fn deployment_plan(&self) -> DeploymentPlan {
        let d = &self.deployment;
        let mut plan = DeploymentPlan::new(&d.template, &d.parameters, self.azure.location.trim());

        plan.subscription_id = self
            .azure
            .subscription_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| EnvUtils::get_optional_var(SUBSCRIPTION_ID_ENV));
        plan.resource_group = d.resource_group.clone();
        plan.tags = d.tags.clone().into_iter().collect();
        plan.write_parameters_in_place = d.write_parameters_in_place;
        plan.insights_name = d.insights_name.clone();
        plan.insights_output = d.insights_output.clone();
        plan.storage_account_name = d.storage_account_name.clone();
        plan.storage_output = d.storage_output.clone();
        plan.env_files = self.env_files.clone();
        plan.db_user = self.database.user.clone();
        plan.db_password = self.database.password.clone();
        plan.polling = DeploymentPolling {
            interval: Duration::from_secs(d.poll_interval_secs),
            max_wait: Duration::from_secs(d.max_wait_secs),
        };
        plan.suffix = d.suffix.as_deref().and_then(|s| Suffix::parse(s).ok());
        plan.suffix_length = d.suffix_length;
        plan
    }

    pub fn azure(&self) -> &AzureConfig {
        &self.azure
    }

    pub fn azure_ad(&self) -> &AzureAdAuthConfig {
        &self.azure_ad
    }

    pub fn deployment(&self) -> &DeploymentConfig {
        &self.deployment
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }

    pub fn env_files(&self) -> &[EnvFileSpec] {
        &self.env_files
    }

    pub fn telemetry(&self) -> &TelemetryConfig {
        &self.telemetry
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }
}

fn default_env_files() -> Vec<EnvFileSpec> {
    vec![
        EnvFileSpec {
            template: PathBuf::from("infra/env/app.env.template"),
            output: PathBuf::from(".env"),
        },
        EnvFileSpec {
            template: PathBuf::from("infra/env/tests.env.template"),
            output: PathBuf::from("tests/.env"),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub subscription_id: Option<String>,
    pub location: String,
    /// Resource Manager endpoint, for sovereign clouds
    pub management_url: Option<String>,
    /// Open the device code verification page in a browser
    pub open_browser: bool,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            subscription_id: None,
            location: "westeurope".to_string(),
            management_url: None,
            open_browser: true,
        }
    }
}

impl AzureConfig {
    pub fn management_url(&self) -> &str {
        self.management_url.as_deref().unwrap_or(AZURE_MANAGEMENT_URL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub resource_group: String,
    pub template: PathBuf,
    pub parameters: PathBuf,
    pub write_parameters_in_place: bool,
    pub insights_name: String,
    pub insights_output: String,
    pub storage_account_name: String,
    pub storage_output: String,
    pub suffix: Option<String>,
    pub suffix_length: usize,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
    pub tags: BTreeMap<String, String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            resource_group: DEFAULT_RESOURCE_GROUP.to_string(),
            template: PathBuf::from("infra/azuredeploy.json"),
            parameters: PathBuf::from("infra/azuredeploy.parameters.json"),
            write_parameters_in_place: true,
            insights_name: DEFAULT_INSIGHTS_NAME.to_string(),
            insights_output: DEFAULT_INSIGHTS_OUTPUT.to_string(),
            storage_account_name: DEFAULT_STORAGE_ACCOUNT_NAME.to_string(),
            storage_output: DEFAULT_STORAGE_OUTPUT.to_string(),
            suffix: None,
            suffix_length: DEFAULT_SUFFIX_LENGTH,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_wait_secs: DEFAULT_MAX_WAIT_SECS,
            tags: BTreeMap::from([("project".to_string(), "azmon".to_string())]),
        }
    }
}

/// Credentials written into the env files as `{DBUSER}` / `{DBPASSWORD}`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "azmonadmin".to_string(),
            password: String::new(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
