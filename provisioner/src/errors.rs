use crate::auth::AuthError;
use thiserror::Error;

/// Errors produced by the provisioning steps.
///
/// Every step of a deployment run returns this type. A failure aborts the run
/// and nothing that was already created in Azure is cleaned up, so the error
/// carries as much context as the control plane gave us.
///
/// # Error Categories
///
/// ## Control plane
/// - [`AzureApi`] - ARM returned a non-success response
/// - [`Request`] - the HTTP request itself failed
/// - [`DeploymentFailed`] / [`DeploymentTimeout`] - template deployment did not succeed
///
/// ## Local inputs
/// - [`Io`], [`Json`], [`Template`], [`EmptyValue`], [`Configuration`]
///
/// [`AzureApi`]: ProvisionError::AzureApi
/// [`Request`]: ProvisionError::Request
/// [`DeploymentFailed`]: ProvisionError::DeploymentFailed
/// [`DeploymentTimeout`]: ProvisionError::DeploymentTimeout
/// [`Io`]: ProvisionError::Io
/// [`Json`]: ProvisionError::Json
/// [`Template`]: ProvisionError::Template
/// [`EmptyValue`]: ProvisionError::EmptyValue
/// [`Configuration`]: ProvisionError::Configuration
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Azure API specific errors with full context
    #[error("Azure API error during {operation}: {code} (HTTP {status_code}) - {message}{}", format_request_id(.request_id))]
    AzureApi {
        code: String,
        status_code: u16,
        message: String,
        request_id: Option<String>,
        operation: String,
    },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("Subscription not found or not usable: {0}")]
    SubscriptionNotFound(String),

    #[error("Subscription selection is ambiguous, candidates: {}", .0.join(", "))]
    AmbiguousSubscription(Vec<String>),

    #[error("Deployment '{name}' ended in state {state}: {details}")]
    DeploymentFailed {
        name: String,
        state: String,
        details: String,
    },

    #[error("Deployment '{name}' did not finish within {seconds}s")]
    DeploymentTimeout { name: String, seconds: u64 },

    #[error("Resource {resource} is missing property '{property}'")]
    MissingProperty { resource: String, property: String },

    #[error("Value for placeholder {0} is empty")]
    EmptyValue(String),

    #[error("Template error in {path}: {reason}")]
    Template { path: String, reason: String },

    #[error("Invalid suffix '{value}': {reason}")]
    InvalidSuffix { value: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_request_id(request_id: &Option<String>) -> String {
    match request_id {
        Some(id) => format!(" [Request ID: {id}]"),
        None => String::new(),
    }
}

impl ProvisionError {
    /// Reads the ARM error body and `x-ms-request-id` of a failed response.
    pub async fn from_azure_response(
        response: reqwest::Response,
        operation: impl Into<String>,
    ) -> Self {
        let operation = operation.into();
        let status_code = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-ms-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        match response.text().await {
            Ok(body) => Self::from_azure_body(&body, status_code, request_id, operation),
            Err(_) => Self::AzureApi {
                code: format!("HTTP_{status_code}"),
                status_code,
                message: format!("HTTP {status_code} error - unable to read response body"),
                request_id,
                operation,
            },
        }
    }

    /// Build an Azure API error from a raw ARM response body.
    pub fn from_azure_body(
        body: &str,
        status_code: u16,
        request_id: Option<String>,
        operation: String,
    ) -> Self {
        if let Ok(azure_error) = serde_json::from_str::<AzureErrorResponse>(body) {
            Self::AzureApi {
                code: azure_error.error.code,
                status_code,
                message: azure_error.error.message,
                request_id,
                operation,
            }
        } else {
            Self::AzureApi {
                code: format!("HTTP_{status_code}"),
                status_code,
                message: if body.is_empty() {
                    format!("HTTP {status_code} error")
                } else {
                    body.to_string()
                },
                request_id,
                operation,
            }
        }
    }

    pub(crate) fn request(url: &str, err: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Get the Azure error code if this is an Azure API error
    pub fn azure_error_code(&self) -> Option<&str> {
        match self {
            ProvisionError::AzureApi { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Get the Azure request ID if available
    pub fn azure_request_id(&self) -> Option<&str> {
        match self {
            ProvisionError::AzureApi { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

/// Azure API error response format
#[derive(Debug, serde::Deserialize)]
struct AzureErrorResponse {
    error: AzureErrorDetails,
}

#[derive(Debug, serde::Deserialize)]
struct AzureErrorDetails {
    code: String,
    message: String,
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_azure_body_parses_arm_error() {
        let body = r#"{"error":{"code":"ResourceGroupNotFound","message":"Resource group 'rg-x' could not be found."}}"#;
        let err = ProvisionError::from_azure_body(
            body,
            404,
            Some("req-1".to_string()),
            "get_insights_keys".to_string(),
        );

        assert_eq!(err.azure_error_code(), Some("ResourceGroupNotFound"));
        assert_eq!(err.azure_request_id(), Some("req-1"));
        let text = err.to_string();
        assert!(text.contains("get_insights_keys"));
        assert!(text.contains("HTTP 404"));
        assert!(text.contains("[Request ID: req-1]"));
    }

    #[test]
    fn test_from_azure_body_falls_back_for_plain_text() {
        let err = ProvisionError::from_azure_body("", 502, None, "deploy".to_string());
        assert_eq!(err.azure_error_code(), Some("HTTP_502"));
        assert!(!err.to_string().contains("Request ID"));
    }

    #[test]
    fn test_ambiguous_subscription_lists_candidates() {
        let err = ProvisionError::AmbiguousSubscription(vec!["a".into(), "b".into()]);
        assert_eq!(
            err.to_string(),
            "Subscription selection is ambiguous, candidates: a, b"
        );
    }
}
