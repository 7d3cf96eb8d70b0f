use super::errors::AuthError;
use super::types::AuthType;
use async_trait::async_trait;

/// Access token for the Azure Resource Manager control plane.
#[derive(Clone, Debug)]
pub struct AuthToken {
    /// The actual authentication token string
    pub token: String,
    /// The type of token (e.g., "Bearer")
    pub token_type: String,
    /// Optional expiration time in seconds from when the token was issued
    pub expires_in_secs: Option<u64>,
}

/// Trait for authentication providers that can obtain management-plane tokens.
///
/// Implemented by the Azure CLI session provider and the Azure AD OAuth2
/// flows (device code, client credentials).
///
/// # Examples
///
/// ```no_run
/// use provisioner::auth::{AuthError, AuthProvider, AuthToken, AuthType};
/// use async_trait::async_trait;
///
/// struct StaticToken;
///
/// #[async_trait]
/// impl AuthProvider for StaticToken {
///     async fn authenticate(&self) -> Result<AuthToken, AuthError> {
///         Ok(AuthToken {
///             token: "example_token".to_string(),
///             token_type: "Bearer".to_string(),
///             expires_in_secs: Some(3600),
///         })
///     }
///
///     fn auth_type(&self) -> AuthType {
///         AuthType::ClientCredentials
///     }
/// }
/// ```
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Performs authentication and returns an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if authentication fails for any reason,
    /// including network issues, invalid credentials, or a missing CLI session.
    async fn authenticate(&self) -> Result<AuthToken, AuthError>;

    /// Returns the authentication type used by this provider.
    fn auth_type(&self) -> AuthType;
}
