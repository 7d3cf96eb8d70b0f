use super::{API_VERSION_SUBSCRIPTIONS, ArmClient, segment};
use crate::errors::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: String,
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub state: String,
    #[serde(rename = "tenantId", default)]
    pub tenant_id: Option<String>,
}

impl Subscription {
    pub fn is_enabled(&self) -> bool {
        self.state.eq_ignore_ascii_case("Enabled")
    }
}

/// The subscription a run deploys into.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSubscription {
    pub subscription_id: String,
    pub tenant_id: String,
    pub display_name: String,
}

impl ArmClient {
    /// List all subscriptions accessible to the authenticated principal
    pub async fn list_subscriptions(&self) -> ProvisionResult<Vec<Subscription>> {
        let url = self.url("/subscriptions", API_VERSION_SUBSCRIPTIONS);
        self.get_all_pages(url, "list_subscriptions").await
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> ProvisionResult<Subscription> {
        let url = self.url(
            &format!("/subscriptions/{}", segment(subscription_id)),
            API_VERSION_SUBSCRIPTIONS,
        );

        match self.get_json(&url, "get_subscription").await {
            Err(ProvisionError::AzureApi {
                status_code: 404, ..
            }) => Err(ProvisionError::SubscriptionNotFound(
                subscription_id.to_string(),
            )),
            other => other,
        }
    }

    /// Resolves the subscription to deploy into.
    ///
    /// With an explicit id the subscription must exist and be enabled.
    /// Without one, exactly one enabled subscription must be visible.
    pub async fn select_subscription(
        &self,
        requested: Option<&str>,
    ) -> ProvisionResult<SelectedSubscription> {
        let subscription = match requested {
            Some(id) => {
                let subscription = self.get_subscription(id).await?;
                choose_subscription(vec![subscription], Some(id))?
            }
            None => choose_subscription(self.list_subscriptions().await?, None)?,
        };

        let tenant_id = subscription.tenant_id.clone().ok_or_else(|| {
            ProvisionError::MissingProperty {
                resource: subscription.id.clone(),
                property: "tenantId".to_string(),
            }
        })?;

        log::info!(
            "Selected subscription '{}' ({}) in tenant {}",
            subscription.display_name,
            subscription.subscription_id,
            tenant_id
        );

        Ok(SelectedSubscription {
            subscription_id: subscription.subscription_id,
            tenant_id,
            display_name: subscription.display_name,
        })
    }
}

fn choose_subscription(
    subscriptions: Vec<Subscription>,
    requested: Option<&str>,
) -> ProvisionResult<Subscription> {
    if let Some(id) = requested {
        return subscriptions
            .into_iter()
            .find(|s| s.subscription_id.eq_ignore_ascii_case(id) && s.is_enabled())
            .ok_or_else(|| ProvisionError::SubscriptionNotFound(id.to_string()));
    }

    let mut enabled: Vec<Subscription> =
        subscriptions.into_iter().filter(|s| s.is_enabled()).collect();

    match enabled.len() {
        0 => Err(ProvisionError::SubscriptionNotFound(
            "no enabled subscription is accessible".to_string(),
        )),
        1 => Ok(enabled.remove(0)),
        _ => Err(ProvisionError::AmbiguousSubscription(
            enabled
                .iter()
                .map(|s| format!("{} ({})", s.display_name, s.subscription_id))
                .collect(),
        )),
    }
}
