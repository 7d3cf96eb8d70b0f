use super::{API_VERSION_STORAGE, ArmClient, resource_group_path, segment};
use crate::errors::{ProvisionError, ProvisionResult};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const STORAGE_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Primary access key of a storage account.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StorageKeys {
    pub account_name: String,
    pub primary_key: String,
}

impl StorageKeys {
    pub fn connection_string(&self) -> String {
        format!(
            "DefaultEndpointsProtocol=https;AccountName={};AccountKey={};EndpointSuffix={}",
            self.account_name, self.primary_key, STORAGE_ENDPOINT_SUFFIX
        )
    }
}

impl std::fmt::Debug for StorageKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageKeys")
            .field("account_name", &self.account_name)
            .field("primary_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ListKeysResponse {
    keys: Vec<AccountKey>,
}

#[derive(Debug, Deserialize)]
struct AccountKey {
    #[serde(rename = "keyName")]
    key_name: String,
    value: String,
}

impl ArmClient {
    /// Lists the account keys and keeps the first one.
    pub async fn get_storage_keys(
        &self,
        subscription_id: &str,
        resource_group: &str,
        account_name: &str,
    ) -> ProvisionResult<StorageKeys> {
        let url = self.url(
            &format!(
                "{}/providers/Microsoft.Storage/storageAccounts/{}/listKeys",
                resource_group_path(subscription_id, resource_group),
                segment(account_name)
            ),
            API_VERSION_STORAGE,
        );

        let response: ListKeysResponse = self.post_empty(&url, "get_storage_keys").await?;
        let key = response
            .keys
            .into_iter()
            .next()
            .ok_or_else(|| ProvisionError::MissingProperty {
                resource: account_name.to_string(),
                property: "keys".to_string(),
            })?;

        log::info!(
            "Retrieved storage key '{}' for account '{account_name}'",
            key.key_name
        );
        Ok(StorageKeys {
            account_name: account_name.to_string(),
            primary_key: key.value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::test_support::client_for;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIST_KEYS_PATH: &str = "/subscriptions/sub-1/resourcegroups/rg-1/providers/Microsoft.Storage/storageAccounts/stabc123/listKeys";

    #[test]
    fn test_connection_string_format() {
        let keys = StorageKeys {
            account_name: "stabc123".to_string(),
            primary_key: "a2V5MQ==".to_string(),
        };
        assert_eq!(
            keys.connection_string(),
            "DefaultEndpointsProtocol=https;AccountName=stabc123;AccountKey=a2V5MQ==;EndpointSuffix=core.windows.net"
        );
        assert!(!format!("{keys:?}").contains("a2V5MQ=="));
    }

    #[tokio::test]
    async fn test_first_key_is_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LIST_KEYS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [
                    {"keyName": "key1", "value": "first==", "permissions": "FULL"},
                    {"keyName": "key2", "value": "second==", "permissions": "FULL"}
                ]
            })))
            .mount(&server)
            .await;

        let keys = client_for(&server.uri())
            .get_storage_keys("sub-1", "rg-1", "stabc123")
            .await
            .unwrap();
        assert_eq!(keys.primary_key, "first==");
    }

    #[tokio::test]
    async fn test_empty_key_list_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(LIST_KEYS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"keys": []})))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .get_storage_keys("sub-1", "rg-1", "stabc123")
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::MissingProperty { .. }));
    }
}
