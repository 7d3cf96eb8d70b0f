use thiserror::Error;

/// Errors that can occur while obtaining a management-plane token
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Authentication configuration error: {0}")]
    Configuration(String),

    #[error("Network error during authentication: {reason}")]
    Network { reason: String },

    #[error("Authentication rejected: {0}")]
    Rejected(String),

    #[error("The device code has expired. Please restart the authentication process.")]
    DeviceCodeExpired,

    #[error("Access was denied. Please ensure you have the necessary permissions.")]
    AccessDenied,

    #[error("Azure CLI not found. Install it and run 'az login' first.")]
    CliNotInstalled,

    #[error("Azure CLI exited with {status}: {stderr}")]
    CliFailed { status: String, stderr: String },

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Maps an OAuth2 `error` code from the token endpoint to a user-facing error.
    pub fn from_oauth_error(error: &str, description: Option<&str>) -> Self {
        match error {
            "invalid_client" => Self::Rejected(
                "Invalid client configuration. Please check your Azure AD app registration and ensure 'Allow public client flows' is enabled.".to_string(),
            ),
            "invalid_request" => Self::Rejected(
                "Invalid authentication request. Please check your client ID and tenant ID."
                    .to_string(),
            ),
            "unauthorized_client" => Self::Rejected(
                "This application is not authorized for the requested flow. Please check Azure AD configuration.".to_string(),
            ),
            "access_denied" => Self::AccessDenied,
            "expired_token" => Self::DeviceCodeExpired,
            other => Self::Rejected(match description {
                Some(desc) => format!("{other} - {desc}"),
                None => other.to_string(),
            }),
        }
    }
}
