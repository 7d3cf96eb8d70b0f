use super::types::{AuthType, CachedToken};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Management tokens, one per authentication method.
#[derive(Clone, Default)]
pub struct TokenCache {
    tokens: Arc<RwLock<HashMap<AuthType, CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token for `method`, unless it is inside the refresh window.
    pub async fn fresh(&self, method: &AuthType) -> Option<String> {
        self.tokens
            .read()
            .await
            .get(method)
            .filter(|cached| !cached.needs_refresh())
            .map(|cached| cached.token.clone())
    }

    pub async fn store(&self, method: AuthType, token: CachedToken) {
        self.tokens.write().await.insert(method, token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_tokens_are_kept_per_method() {
        let cache = TokenCache::new();
        assert!(cache.fresh(&AuthType::AzureCli).await.is_none());

        cache
            .store(
                AuthType::AzureCli,
                CachedToken::new("cli".into(), Duration::from_secs(3600), "Bearer".into()),
            )
            .await;

        assert_eq!(cache.fresh(&AuthType::AzureCli).await.as_deref(), Some("cli"));
        assert!(cache.fresh(&AuthType::DeviceCode).await.is_none());
    }

    #[tokio::test]
    async fn test_token_near_expiry_is_not_fresh() {
        let cache = TokenCache::new();
        // Inside the five minute refresh buffer
        cache
            .store(
                AuthType::ClientCredentials,
                CachedToken::new("old".into(), Duration::from_secs(120), "Bearer".into()),
            )
            .await;

        assert!(cache.fresh(&AuthType::ClientCredentials).await.is_none());
    }
}
