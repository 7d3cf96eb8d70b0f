use super::{API_VERSION_RESOURCE_GROUPS, ArmClient, resource_group_path};
use crate::errors::ProvisionResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceGroupProperties {
    #[serde(rename = "provisioningState")]
    pub provisioning_state: String,
}

#[derive(Serialize)]
struct CreateResourceGroupBody<'a> {
    location: &'a str,
    tags: &'a HashMap<String, String>,
}

impl ArmClient {
    /// Creates the resource group, or updates it when it already exists.
    pub async fn create_resource_group(
        &self,
        subscription_id: &str,
        name: &str,
        location: &str,
        tags: &HashMap<String, String>,
    ) -> ProvisionResult<ResourceGroup> {
        let url = self.url(
            &resource_group_path(subscription_id, name),
            API_VERSION_RESOURCE_GROUPS,
        );
        let body = CreateResourceGroupBody { location, tags };

        let group: ResourceGroup = self.put_json(&url, &body, "create_resource_group").await?;
        log::info!("Resource group '{}' ready in {}", group.name, group.location);
        Ok(group)
    }
}
