use super::{API_VERSION_INSIGHTS, ArmClient, resource_group_path, segment};
use crate::errors::{ProvisionError, ProvisionResult};
use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Keys of an Application Insights component.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct InsightsKeys {
    pub instrumentation_key: String,
    pub connection_string: String,
}

impl std::fmt::Debug for InsightsKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightsKeys")
            .field("instrumentation_key", &self.instrumentation_key)
            .field("connection_string", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ComponentResource {
    id: String,
    properties: ComponentProperties,
}

// The component API uses PascalCase for these two properties
#[derive(Debug, Deserialize)]
struct ComponentProperties {
    #[serde(rename = "InstrumentationKey", default)]
    instrumentation_key: Option<String>,
    #[serde(rename = "ConnectionString", default)]
    connection_string: Option<String>,
}

impl ArmClient {
    /// Reads the instrumentation key and connection string of a component.
    pub async fn get_insights_keys(
        &self,
        subscription_id: &str,
        resource_group: &str,
        component: &str,
    ) -> ProvisionResult<InsightsKeys> {
        let url = self.url(
            &format!(
                "{}/providers/Microsoft.Insights/components/{}",
                resource_group_path(subscription_id, resource_group),
                segment(component)
            ),
            API_VERSION_INSIGHTS,
        );

        let resource: ComponentResource = self.get_json(&url, "get_insights_keys").await?;
        let missing = |property: &str| ProvisionError::MissingProperty {
            resource: resource.id.clone(),
            property: property.to_string(),
        };

        let instrumentation_key = resource
            .properties
            .instrumentation_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing("InstrumentationKey"))?;
        let connection_string = resource
            .properties
            .connection_string
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| missing("ConnectionString"))?;

        log::info!("Retrieved Application Insights keys for '{component}'");
        Ok(InsightsKeys {
            instrumentation_key,
            connection_string,
        })
    }
}
