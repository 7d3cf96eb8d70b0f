use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
pub const DEFAULT_MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// Authentication method types supported by the provisioner.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// Reuse the session of a logged-in Azure CLI (`az login`)
    #[default]
    AzureCli,
    /// Interactive Azure AD device code flow
    DeviceCode,
    /// Service principal (client id + secret)
    ClientCredentials,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::AzureCli => "azure_cli",
            AuthType::DeviceCode => "device_code",
            AuthType::ClientCredentials => "client_credentials",
        }
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for obtaining a management-plane token.
///
/// # Required Fields per method
///
/// - `azure_cli` - nothing; `tenant_id` optionally pins the CLI tenant
/// - `device_code` - `tenant_id`, `client_id`
/// - `client_credentials` - `tenant_id`, `client_id`, `client_secret`
///
/// # Examples
///
/// ```no_run
/// use provisioner::auth::{AuthType, AzureAdAuthConfig};
///
/// let config = AzureAdAuthConfig {
///     auth_method: AuthType::ClientCredentials,
///     tenant_id: Some("your-tenant-id".to_string()),
///     client_id: Some("your-client-id".to_string()),
///     client_secret: Some("your-client-secret".to_string()),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AzureAdAuthConfig {
    #[serde(default)]
    pub auth_method: AuthType,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Azure AD authority host URL (defaults to https://login.microsoftonline.com)
    pub authority_host: Option<String>,
    /// OAuth scope for token requests (defaults to https://management.azure.com/.default)
    pub scope: Option<String>,
    /// Azure CLI executable (defaults to `az`, `az.cmd` on Windows)
    pub cli_program: Option<String>,
}

impl AzureAdAuthConfig {
    pub fn authority_host(&self) -> &str {
        self.authority_host
            .as_deref()
            .unwrap_or(DEFAULT_AUTHORITY_HOST)
            .trim_end_matches('/')
    }

    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_MANAGEMENT_SCOPE)
    }

    pub fn cli_program(&self) -> &str {
        match self.cli_program.as_deref() {
            Some(program) => program,
            None if cfg!(windows) => "az.cmd",
            None => "az",
        }
    }
}

impl std::fmt::Debug for AzureAdAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAdAuthConfig")
            .field("auth_method", &self.auth_method)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("authority_host", &self.authority_host)
            .field("scope", &self.scope)
            .field("cli_program", &self.cli_program)
            .finish()
    }
}

/// A cached authentication token with expiration tracking.
#[derive(Clone, Debug)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: Instant,
    pub token_type: String,
}

impl CachedToken {
    pub fn new(token: String, expires_in: Duration, token_type: String) -> Self {
        Self {
            token,
            expires_at: Instant::now() + expires_in,
            token_type,
        }
    }

    /// Uses a 5-minute buffer before expiration.
    pub fn needs_refresh(&self) -> bool {
        let buffer = Duration::from_secs(300);
        Instant::now() + buffer >= self.expires_at
    }
}

/// What the user has to do to finish a device code sign-in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceCodeInfo {
    pub user_code: String,
    pub verification_uri: String,
    /// Human-readable message with authentication instructions
    pub message: String,
}
