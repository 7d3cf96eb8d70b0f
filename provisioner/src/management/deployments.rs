use super::{API_VERSION_DEPLOYMENTS, ArmClient, resource_group_path, segment};
use crate::errors::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// An ARM template plus the parameter values to deploy it with.
#[derive(Debug, Clone)]
pub struct TemplateDeployment {
    pub name: String,
    pub template: Value,
    pub parameters: Value,
}

/// How long and how often to wait for a deployment to reach a terminal state.
#[derive(Debug, Clone, Copy)]
pub struct DeploymentPolling {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for DeploymentPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Accepted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl ProvisioningState {
    pub fn parse(value: &str) -> Self {
        match value {
            "Accepted" => Self::Accepted,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => f.write_str("Accepted"),
            Self::Running => f.write_str("Running"),
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Failed => f.write_str("Failed"),
            Self::Canceled => f.write_str("Canceled"),
            Self::Other(state) => f.write_str(state),
        }
    }
}

/// Result of a successful deployment.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub name: String,
    pub state: ProvisioningState,
    /// Template outputs with the ARM `{type, value}` wrapper removed
    pub outputs: HashMap<String, Value>,
    pub duration: Option<String>,
}

impl DeploymentOutcome {
    pub fn output_str(&self, name: &str) -> Option<&str> {
        self.outputs.get(name).and_then(Value::as_str)
    }
}

#[derive(Serialize)]
struct DeploymentBody<'a> {
    properties: DeploymentBodyProperties<'a>,
}

#[derive(Serialize)]
struct DeploymentBodyProperties<'a> {
    mode: &'static str,
    template: &'a Value,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct DeploymentResource {
    name: String,
    properties: DeploymentProperties,
}

#[derive(Debug, Deserialize)]
struct DeploymentProperties {
    #[serde(rename = "provisioningState")]
    provisioning_state: String,
    #[serde(default)]
    outputs: Option<HashMap<String, OutputValue>>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OutputValue {
    #[serde(default)]
    value: Value,
}

impl ArmClient {
    /// Deploys the template in incremental mode and waits for it to finish.
    pub async fn deploy_template(
        &self,
        subscription_id: &str,
        resource_group: &str,
        deployment: &TemplateDeployment,
        polling: DeploymentPolling,
    ) -> ProvisionResult<DeploymentOutcome> {
        let url = self.deployment_url(subscription_id, resource_group, &deployment.name);
        let body = DeploymentBody {
            properties: DeploymentBodyProperties {
                mode: "Incremental",
                template: &deployment.template,
                parameters: &deployment.parameters,
            },
        };

        log::info!(
            "Starting deployment '{}' into resource group '{}'",
            deployment.name,
            resource_group
        );
        let mut resource: DeploymentResource =
            self.put_json(&url, &body, "deploy_template").await?;

        let started = Instant::now();
        loop {
            let state = ProvisioningState::parse(&resource.properties.provisioning_state);
            if state.is_terminal() {
                return finish(resource, state);
            }

            if started.elapsed() >= polling.max_wait {
                return Err(ProvisionError::DeploymentTimeout {
                    name: deployment.name.clone(),
                    seconds: polling.max_wait.as_secs(),
                });
            }

            log::debug!("Deployment '{}' is {state}", deployment.name);
            tokio::time::sleep(polling.interval).await;
            resource = self.get_json(&url, "get_deployment").await?;
        }
    }

    fn deployment_url(&self, subscription_id: &str, resource_group: &str, name: &str) -> String {
        self.url(
            &format!(
                "{}/providers/Microsoft.Resources/deployments/{}",
                resource_group_path(subscription_id, resource_group),
                segment(name)
            ),
            API_VERSION_DEPLOYMENTS,
        )
    }
}

fn finish(
    resource: DeploymentResource,
    state: ProvisioningState,
) -> ProvisionResult<DeploymentOutcome> {
    let properties = resource.properties;
    if state != ProvisioningState::Succeeded {
        let details = properties
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no error details returned".to_string());
        return Err(ProvisionError::DeploymentFailed {
            name: resource.name,
            state: state.to_string(),
            details,
        });
    }

    let outputs = properties
        .outputs
        .unwrap_or_default()
        .into_iter()
        .map(|(name, output)| (name, output.value))
        .collect();

    log::info!(
        "Deployment '{}' succeeded{}",
        resource.name,
        properties
            .duration
            .as_deref()
            .map(|d| format!(" in {d}"))
            .unwrap_or_default()
    );

    Ok(DeploymentOutcome {
        name: resource.name,
        state,
        outputs,
        duration: properties.duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::test_support::client_for;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEPLOYMENT_PATH: &str =
        "/subscriptions/sub-1/resourcegroups/rg-1/providers/Microsoft.Resources/deployments/azmon-1";

    fn deployment() -> TemplateDeployment {
        TemplateDeployment {
            name: "azmon-1".to_string(),
            template: json!({"resources": []}),
            parameters: json!({"suffix": {"value": "abc123"}}),
        }
    }

    fn fast_polling() -> DeploymentPolling {
        DeploymentPolling {
            interval: Duration::from_millis(10),
            max_wait: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_provisioning_state_terminality() {
        assert!(ProvisioningState::parse("Succeeded").is_terminal());
        assert!(ProvisioningState::parse("Canceled").is_terminal());
        assert!(!ProvisioningState::parse("Running").is_terminal());
        assert_eq!(
            ProvisioningState::parse("Validating"),
            ProvisioningState::Other("Validating".to_string())
        );
    }

    #[tokio::test]
    async fn test_deploy_polls_until_succeeded_and_unwraps_outputs() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(DEPLOYMENT_PATH))
            .and(body_partial_json(json!({
                "properties": {"mode": "Incremental", "parameters": {"suffix": {"value": "abc123"}}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "azmon-1",
                "properties": {"provisioningState": "Accepted"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(DEPLOYMENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "azmon-1",
                "properties": {"provisioningState": "Running"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(DEPLOYMENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "azmon-1",
                "properties": {
                    "provisioningState": "Succeeded",
                    "duration": "PT1M2S",
                    "outputs": {
                        "appInsightsName": {"type": "String", "value": "appi-abc123"},
                        "storageAccountName": {"type": "String", "value": "stabc123"}
                    }
                }
            })))
            .mount(&server)
            .await;

        let outcome = client_for(&server.uri())
            .deploy_template("sub-1", "rg-1", &deployment(), fast_polling())
            .await
            .unwrap();

        assert_eq!(outcome.state, ProvisioningState::Succeeded);
        assert_eq!(outcome.output_str("appInsightsName"), Some("appi-abc123"));
        assert_eq!(outcome.output_str("storageAccountName"), Some("stabc123"));
        assert_eq!(outcome.duration.as_deref(), Some("PT1M2S"));
    }

    #[tokio::test]
    async fn test_failed_deployment_carries_error_details() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(DEPLOYMENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "azmon-1",
                "properties": {
                    "provisioningState": "Failed",
                    "error": {"code": "StorageAccountAlreadyTaken", "message": "The storage account named stabc123 is already taken."}
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .deploy_template("sub-1", "rg-1", &deployment(), fast_polling())
            .await
            .unwrap_err();

        match err {
            ProvisionError::DeploymentFailed { state, details, .. } => {
                assert_eq!(state, "Failed");
                assert!(details.contains("StorageAccountAlreadyTaken"));
            }
            other => panic!("Expected DeploymentFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deployment_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(DEPLOYMENT_PATH))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "azmon-1",
                "properties": {"provisioningState": "Running"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(DEPLOYMENT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "azmon-1",
                "properties": {"provisioningState": "Running"}
            })))
            .mount(&server)
            .await;

        let polling = DeploymentPolling {
            interval: Duration::from_millis(10),
            max_wait: Duration::from_millis(50),
        };
        let err = client_for(&server.uri())
            .deploy_template("sub-1", "rg-1", &deployment(), polling)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::DeploymentTimeout { .. }));
    }
}
