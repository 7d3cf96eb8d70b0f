use super::errors::AuthError;
use super::provider::{AuthProvider, AuthToken};
use super::types::{AuthType, AzureAdAuthConfig, DeviceCodeInfo};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Invoked once the device code has been issued so the caller can show it.
pub type DeviceCodeCallback = Arc<dyn Fn(&DeviceCodeInfo) + Send + Sync>;

#[derive(Clone, Debug)]
pub struct DeviceCodeFlowInfo {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    pub interval: u64,
    pub message: String,
}

impl DeviceCodeFlowInfo {
    pub fn user_info(&self) -> DeviceCodeInfo {
        DeviceCodeInfo {
            user_code: self.user_code.clone(),
            verification_uri: self.verification_uri.clone(),
            message: self.message.clone(),
        }
    }
}

/// Azure AD OAuth2 provider for the device code and client credentials flows.
#[derive(Clone)]
pub struct AzureAdProvider {
    config: AzureAdAuthConfig,
    http_client: reqwest::Client,
    on_device_code: Option<DeviceCodeCallback>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: u64,
    message: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    error_description: Option<String>,
}

impl AzureAdProvider {
    pub fn new(config: AzureAdAuthConfig, http_client: reqwest::Client) -> Result<Self, AuthError> {
        if config.auth_method == AuthType::AzureCli {
            return Err(AuthError::Configuration(
                "AzureAdProvider handles device_code and client_credentials only".to_string(),
            ));
        }
        Ok(Self {
            config,
            http_client,
            on_device_code: None,
        })
    }

    pub fn with_device_code_callback(mut self, callback: DeviceCodeCallback) -> Self {
        self.on_device_code = Some(callback);
        self
    }

    fn tenant_id(&self) -> Result<&str, AuthError> {
        self.config.tenant_id.as_deref().ok_or_else(|| {
            AuthError::Configuration("Azure AD tenant_id is required".to_string())
        })
    }

    fn client_id(&self) -> Result<&str, AuthError> {
        self.config.client_id.as_deref().ok_or_else(|| {
            AuthError::Configuration("Azure AD client_id is required".to_string())
        })
    }

    fn client_secret(&self) -> Result<&str, AuthError> {
        self.config.client_secret.as_deref().ok_or_else(|| {
            AuthError::Configuration(
                "Azure AD client_secret is required for client_credentials".to_string(),
            )
        })
    }

    fn token_url(&self) -> Result<String, AuthError> {
        Ok(format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_host(),
            self.tenant_id()?
        ))
    }

    async fn client_credentials_flow(&self) -> Result<AuthToken, AuthError> {
        let token_url = self.token_url()?;
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id()?),
            ("client_secret", self.client_secret()?),
            ("scope", self.config.scope()),
        ];

        let response = self
            .http_client
            .post(&token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network {
                reason: format!("Failed to request token: {e}"),
            })?;

        if !response.status().is_success() {
            let error_info = response.json::<ErrorResponse>().await.map_err(|e| {
                AuthError::InvalidResponse(format!("Failed to parse error response: {e}"))
            })?;
            return Err(AuthError::from_oauth_error(
                &error_info.error,
                error_info.error_description.as_deref(),
            ));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse token response: {e}"))
        })?;

        log::debug!("Obtained management token via client credentials");
        Ok(AuthToken {
            token: token.access_token,
            token_type: token.token_type,
            expires_in_secs: Some(token.expires_in),
        })
    }

    async fn device_code_flow(&self) -> Result<AuthToken, AuthError> {
        let device_info = self.start_device_code_flow().await?;

        log::info!("Device code authentication initiated - awaiting user action");
        match &self.on_device_code {
            Some(callback) => callback(&device_info.user_info()),
            None => log::warn!("{}", device_info.message),
        }

        self.poll_device_code_token(&device_info).await
    }

    pub async fn start_device_code_flow(&self) -> Result<DeviceCodeFlowInfo, AuthError> {
        let device_code_url = format!(
            "{}/{}/oauth2/v2.0/devicecode",
            self.config.authority_host(),
            self.tenant_id()?
        );

        let params = [("client_id", self.client_id()?), ("scope", self.config.scope())];

        let device_response = self
            .http_client
            .post(&device_code_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::Network {
                reason: format!("Failed to initiate device code flow: {e}"),
            })?;

        if !device_response.status().is_success() {
            let error_info =
                device_response
                    .json::<ErrorResponse>()
                    .await
                    .unwrap_or(ErrorResponse {
                        error: "unknown_error".to_string(),
                        error_description: Some("Failed to parse error response".to_string()),
                    });

            return Err(AuthError::from_oauth_error(
                &error_info.error,
                error_info.error_description.as_deref(),
            ));
        }

        let device_code: DeviceCodeResponse = device_response.json().await.map_err(|e| {
            AuthError::InvalidResponse(format!("Failed to parse device code response: {e}"))
        })?;

        Ok(DeviceCodeFlowInfo {
            device_code: device_code.device_code,
            user_code: device_code.user_code,
            verification_uri: device_code.verification_uri,
            expires_in: device_code.expires_in,
            interval: device_code.interval,
            message: device_code.message,
        })
    }

    pub async fn poll_device_code_token(
        &self,
        device_info: &DeviceCodeFlowInfo,
    ) -> Result<AuthToken, AuthError> {
        let token_url = self.token_url()?;

        let mut interval = Duration::from_secs(device_info.interval);
        let timeout = Duration::from_secs(device_info.expires_in);
        let start = Instant::now();

        loop {
            if start.elapsed() > timeout {
                return Err(AuthError::DeviceCodeExpired);
            }

            tokio::time::sleep(interval).await;

            let params = [
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                ("client_id", self.client_id()?),
                ("device_code", device_info.device_code.as_str()),
            ];

            let response = self
                .http_client
                .post(&token_url)
                .form(&params)
                .send()
                .await
                .map_err(|e| AuthError::Network {
                    reason: format!("Failed to poll for token: {e}"),
                })?;

            if response.status().is_success() {
                let token_response: TokenResponse = response.json().await.map_err(|e| {
                    AuthError::InvalidResponse(format!("Failed to parse token response: {e}"))
                })?;

                return Ok(AuthToken {
                    token: token_response.access_token,
                    token_type: token_response.token_type,
                    expires_in_secs: Some(token_response.expires_in),
                });
            }

            let error_response: serde_json::Value = response.json().await.unwrap_or_default();

            match error_response["error"].as_str() {
                Some("authorization_pending") => {
                    log::debug!("Waiting for user to complete authentication");
                }
                Some("slow_down") => {
                    log::debug!("Polling too frequently, increasing interval");
                    interval += Duration::from_secs(5);
                }
                Some(error) => {
                    return Err(AuthError::from_oauth_error(
                        error,
                        error_response["error_description"].as_str(),
                    ));
                }
                None => {
                    return Err(AuthError::InvalidResponse(
                        "Token endpoint returned an error without an error code".to_string(),
                    ));
                }
            }
        }
    }
}

#[async_trait]
impl AuthProvider for AzureAdProvider {
    async fn authenticate(&self) -> Result<AuthToken, AuthError> {
        match self.config.auth_method {
            AuthType::DeviceCode => self.device_code_flow().await,
            AuthType::ClientCredentials => self.client_credentials_flow().await,
            AuthType::AzureCli => Err(AuthError::Configuration(
                "Azure CLI authentication is not handled by AzureAdProvider".to_string(),
            )),
        }
    }

    fn auth_type(&self) -> AuthType {
        self.config.auth_method.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_credentials_config(authority: &str) -> AzureAdAuthConfig {
        AzureAdAuthConfig {
            auth_method: AuthType::ClientCredentials,
            tenant_id: Some("tenant-1".to_string()),
            client_id: Some("client-1".to_string()),
            client_secret: Some("secret-1".to_string()),
            authority_host: Some(authority.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_azure_cli_method() {
        let result = AzureAdProvider::new(AzureAdAuthConfig::default(), reqwest::Client::new());
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_client_credentials_flow_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "arm-token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        let provider =
            AzureAdProvider::new(client_credentials_config(&server.uri()), reqwest::Client::new())
                .unwrap();
        let token = provider.authenticate().await.unwrap();

        assert_eq!(token.token, "arm-token");
        assert_eq!(token.expires_in_secs, Some(3599));
    }

    #[tokio::test]
    async fn test_client_credentials_flow_maps_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "AADSTS7000215: Invalid client secret provided."
            })))
            .mount(&server)
            .await;

        let provider =
            AzureAdProvider::new(client_credentials_config(&server.uri()), reqwest::Client::new())
                .unwrap();
        let err = provider.authenticate().await.unwrap_err();

        assert!(matches!(err, AuthError::Rejected(msg) if msg.contains("Invalid client")));
    }

    #[tokio::test]
    async fn test_missing_secret_is_configuration_error() {
        let mut config = client_credentials_config("http://127.0.0.1:9");
        config.client_secret = None;
        let provider = AzureAdProvider::new(config, reqwest::Client::new()).unwrap();

        let err = provider.authenticate().await.unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    fn device_provider(server: &MockServer) -> AzureAdProvider {
        let mut config = client_credentials_config(&server.uri());
        config.auth_method = AuthType::DeviceCode;
        AzureAdProvider::new(config, reqwest::Client::new()).unwrap()
    }

    fn device_info(expires_in: u64) -> DeviceCodeFlowInfo {
        DeviceCodeFlowInfo {
            device_code: "dc".to_string(),
            user_code: "ABCD".to_string(),
            verification_uri: "https://microsoft.com/devicelogin".to_string(),
            expires_in,
            interval: 0,
            message: "enter ABCD".to_string(),
        }
    }

    async fn mount_poll_error(server: &MockServer, error: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("device_code=dc"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": error
            })))
            .up_to_n_times(times)
            .mount(server)
            .await;
    }

    async fn mount_device_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "device-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_device_code_poll_returns_token_after_pending() {
        let server = MockServer::start().await;
        mount_poll_error(&server, "authorization_pending", 1).await;
        mount_device_token(&server).await;

        let token = device_provider(&server)
            .poll_device_code_token(&device_info(30))
            .await
            .unwrap();
        assert_eq!(token.token, "device-token");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_device_code_poll_backs_off_on_slow_down() {
        let server = MockServer::start().await;
        mount_poll_error(&server, "slow_down", 1).await;
        mount_device_token(&server).await;

        let started = Instant::now();
        let token = device_provider(&server)
            .poll_device_code_token(&device_info(30))
            .await
            .unwrap();

        assert_eq!(token.token, "device-token");
        // The interval starts at zero and grows by five seconds
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_device_code_poll_reports_expired_token() {
        let server = MockServer::start().await;
        mount_poll_error(&server, "expired_token", u64::MAX).await;

        let err = device_provider(&server)
            .poll_device_code_token(&device_info(30))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DeviceCodeExpired));
    }

    #[tokio::test]
    async fn test_device_code_poll_gives_up_after_expiry() {
        let server = MockServer::start().await;
        mount_poll_error(&server, "authorization_pending", u64::MAX).await;

        let err = device_provider(&server)
            .poll_device_code_token(&device_info(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DeviceCodeExpired));
    }

    #[tokio::test]
    async fn test_device_code_poll_stops_on_denied() {
        let server = MockServer::start().await;
        mount_poll_error(&server, "access_denied", u64::MAX).await;

        let err = device_provider(&server)
            .poll_device_code_token(&device_info(30))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccessDenied));
    }
}
