//! Azure Resource Manager client.
//!
//! Thin REST client over `https://management.azure.com` covering the calls a
//! deployment run needs: subscription selection, resource group creation,
//! template deployment and key retrieval for Application Insights and storage.

pub mod deployments;
pub mod insights;
pub mod resource_groups;
pub mod storage;
pub mod subscriptions;

pub use deployments::{DeploymentOutcome, DeploymentPolling, ProvisioningState, TemplateDeployment};
pub use insights::InsightsKeys;
pub use resource_groups::ResourceGroup;
pub use storage::StorageKeys;
pub use subscriptions::{SelectedSubscription, Subscription};

use crate::auth::{AuthType, TokenSource};
use crate::errors::{ProvisionError, ProvisionResult};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const AZURE_MANAGEMENT_URL: &str = "https://management.azure.com";
pub const API_VERSION_SUBSCRIPTIONS: &str = "2022-12-01";
pub const API_VERSION_RESOURCE_GROUPS: &str = "2021-04-01";
pub const API_VERSION_DEPLOYMENTS: &str = "2021-04-01";
pub const API_VERSION_INSIGHTS: &str = "2020-02-02";
pub const API_VERSION_STORAGE: &str = "2023-01-01";

#[derive(Clone)]
pub struct ArmClient {
    client: reqwest::Client,
    base_url: String,
    tokens: TokenSource,
}

#[derive(Debug, Serialize, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

impl ArmClient {
    pub fn new(client: reqwest::Client, tokens: TokenSource) -> Self {
        Self::with_base_url(client, tokens, AZURE_MANAGEMENT_URL)
    }

    /// Points the client at another ARM endpoint (sovereign clouds, local mocks).
    pub fn with_base_url(
        client: reqwest::Client,
        tokens: TokenSource,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Acquires the management token up front so a login problem surfaces
    /// before any resource is touched.
    pub async fn authenticate(&self) -> ProvisionResult<AuthType> {
        self.tokens.bearer_token().await?;
        Ok(self.tokens.auth_type())
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.base_url, path, api_version)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
        operation: &str,
    ) -> ProvisionResult<T> {
        let token = self.tokens.bearer_token().await?;

        let response = request
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| ProvisionError::request(url, e))?;

        if !response.status().is_success() {
            return Err(ProvisionError::from_azure_response(response, operation).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProvisionError::request(url, e))?;

        serde_json::from_str(&body).map_err(|e| ProvisionError::json(operation, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, operation: &str) -> ProvisionResult<T> {
        log::debug!("GET {url}");
        self.send(self.client.get(url), url, operation).await
    }

    async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        operation: &str,
    ) -> ProvisionResult<T> {
        log::debug!("PUT {url}");
        self.send(self.client.put(url).json(body), url, operation)
            .await
    }

    async fn post_empty<T: DeserializeOwned>(&self, url: &str, operation: &str) -> ProvisionResult<T> {
        log::debug!("POST {url}");
        // ARM action endpoints expect an empty JSON body
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body("{}");
        self.send(request, url, operation).await
    }

    /// Follows `nextLink` until every page has been read.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        first_url: String,
        operation: &str,
    ) -> ProvisionResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first_url);

        while let Some(url) = next {
            let page: ListResponse<T> = self.get_json(&url, operation).await?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn resource_group_path(subscription_id: &str, resource_group: &str) -> String {
    format!(
        "/subscriptions/{}/resourcegroups/{}",
        segment(subscription_id),
        segment(resource_group)
    )
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::{AuthError, AuthProvider, AuthToken, AuthType};
    use async_trait::async_trait;
    use std::sync::Arc;

    pub struct StaticTokenProvider;

    #[async_trait]
    impl AuthProvider for StaticTokenProvider {
        async fn authenticate(&self) -> Result<AuthToken, AuthError> {
            Ok(AuthToken {
                token: "test-token".to_string(),
                token_type: "Bearer".to_string(),
                expires_in_secs: Some(3600),
            })
        }

        fn auth_type(&self) -> AuthType {
            AuthType::ClientCredentials
        }
    }

    pub fn client_for(base_url: &str) -> ArmClient {
        ArmClient::with_base_url(
            reqwest::Client::new(),
            TokenSource::new(Arc::new(StaticTokenProvider)),
            base_url,
        )
    }
}
