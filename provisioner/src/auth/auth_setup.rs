//! Provider selection and token caching.
//!
//! [`create_auth_provider`] picks the provider for the configured
//! [`AuthType`]; [`TokenSource`] wraps it with a [`TokenCache`] so that every
//! control-plane call of a run reuses the same token until it nears expiry.

use super::azure_ad::{AzureAdProvider, DeviceCodeCallback};
use super::azure_cli::AzureCliProvider;
use super::errors::AuthError;
use super::provider::AuthProvider;
use super::token_cache::TokenCache;
use super::types::{AuthType, AzureAdAuthConfig, CachedToken};
use std::sync::Arc;
use std::time::Duration;

/// Tokens without an advertised lifetime are kept for ten minutes.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(600);

/// Creates an authentication provider for the configured method.
///
/// # Errors
///
/// Returns [`AuthError::Configuration`] if the Azure AD provider rejects the
/// configuration.
pub fn create_auth_provider(
    config: &AzureAdAuthConfig,
    http_client: reqwest::Client,
    on_device_code: Option<DeviceCodeCallback>,
) -> Result<Arc<dyn AuthProvider>, AuthError> {
    match config.auth_method {
        AuthType::AzureCli => Ok(Arc::new(AzureCliProvider::new(config))),
        AuthType::DeviceCode | AuthType::ClientCredentials => {
            let mut provider = AzureAdProvider::new(config.clone(), http_client)?;
            if let Some(callback) = on_device_code {
                provider = provider.with_device_code_callback(callback);
            }
            Ok(Arc::new(provider))
        }
    }
}

/// A provider plus the cache of the token it last produced.
#[derive(Clone)]
pub struct TokenSource {
    provider: Arc<dyn AuthProvider>,
    cache: TokenCache,
}

impl TokenSource {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        Self {
            provider,
            cache: TokenCache::new(),
        }
    }

    pub fn auth_type(&self) -> AuthType {
        self.provider.auth_type()
    }

    /// Returns a cached token or authenticates again when it is close to expiry.
    pub async fn bearer_token(&self) -> Result<String, AuthError> {
        let method = self.provider.auth_type();
        if let Some(token) = self.cache.fresh(&method).await {
            return Ok(token);
        }

        let token = self.provider.authenticate().await?;
        let lifetime = token
            .expires_in_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        log::debug!("Obtained a {method} token valid for {}s", lifetime.as_secs());
        self.cache
            .store(
                method,
                CachedToken::new(token.token.clone(), lifetime, token.token_type),
            )
            .await;
        Ok(token.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthToken;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        expires_in_secs: Option<u64>,
    }

    #[async_trait]
    impl AuthProvider for CountingProvider {
        async fn authenticate(&self) -> Result<AuthToken, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthToken {
                token: format!("token-{n}"),
                token_type: "Bearer".to_string(),
                expires_in_secs: self.expires_in_secs,
            })
        }

        fn auth_type(&self) -> AuthType {
            AuthType::ClientCredentials
        }
    }

    #[tokio::test]
    async fn test_token_is_reused_while_fresh() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            expires_in_secs: Some(3600),
        });
        let source = TokenSource::new(provider.clone());

        assert_eq!(source.bearer_token().await.unwrap(), "token-0");
        assert_eq!(source.bearer_token().await.unwrap(), "token-0");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_lived_token_is_refreshed() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            expires_in_secs: Some(30),
        });
        let source = TokenSource::new(provider.clone());

        assert_eq!(source.bearer_token().await.unwrap(), "token-0");
        assert_eq!(source.bearer_token().await.unwrap(), "token-1");
    }

    #[test]
    fn test_create_provider_for_each_method() {
        let cli = create_auth_provider(&AzureAdAuthConfig::default(), reqwest::Client::new(), None)
            .unwrap();
        assert_eq!(cli.auth_type(), AuthType::AzureCli);

        let config = AzureAdAuthConfig {
            auth_method: AuthType::DeviceCode,
            ..Default::default()
        };
        let device = create_auth_provider(&config, reqwest::Client::new(), None).unwrap();
        assert_eq!(device.auth_type(), AuthType::DeviceCode);
    }
}
