//! Management-plane tokens from a logged-in Azure CLI session.
//!
//! Runs `az account get-access-token` and reads its JSON output. The user is
//! expected to have run `az login` beforehand.

use super::errors::AuthError;
use super::provider::{AuthProvider, AuthToken};
use super::types::{AuthType, AzureAdAuthConfig, MANAGEMENT_RESOURCE};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

#[derive(Clone, Debug)]
pub struct AzureCliProvider {
    program: String,
    tenant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    /// Unix timestamp, present in azure-cli 2.54 and later
    #[serde(rename = "expires_on")]
    expires_on: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl AzureCliProvider {
    pub fn new(config: &AzureAdAuthConfig) -> Self {
        Self {
            program: config.cli_program().to_string(),
            tenant_id: config.tenant_id.clone(),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "account".to_string(),
            "get-access-token".to_string(),
            "--resource".to_string(),
            MANAGEMENT_RESOURCE.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(tenant) = &self.tenant_id {
            args.push("--tenant".to_string());
            args.push(tenant.clone());
        }
        args
    }

    fn parse_output(stdout: &[u8]) -> Result<AuthToken, AuthError> {
        let response: CliTokenResponse = serde_json::from_slice(stdout).map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse Azure CLI output: {e}"))
        })?;

        let expires_in_secs = response.expires_on.map(|expires_on| {
            let remaining = expires_on - chrono::Utc::now().timestamp();
            remaining.max(0) as u64
        });

        Ok(AuthToken {
            token: response.access_token,
            token_type: response.token_type,
            expires_in_secs,
        })
    }
}

#[async_trait]
impl AuthProvider for AzureCliProvider {
    async fn authenticate(&self) -> Result<AuthToken, AuthError> {
        log::debug!("Requesting management token from {}", self.program);

        let output = Command::new(&self.program)
            .args(self.args())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AuthError::CliNotInstalled,
                _ => AuthError::CliFailed {
                    status: "spawn error".to_string(),
                    stderr: e.to_string(),
                },
            })?;

        if !output.status.success() {
            return Err(AuthError::CliFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Self::parse_output(&output.stdout)
    }

    fn auth_type(&self) -> AuthType {
        AuthType::AzureCli
    }
}
