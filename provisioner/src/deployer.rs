//! The end-to-end provisioning run.
//!
//! [`Deployer::run`] performs the steps strictly in order:
//!
//! 1. authenticate against Azure
//! 2. select the subscription
//! 3. create the resource group
//! 4. deploy the ARM template with the suffix substituted into its parameters
//! 5. read the Application Insights and storage keys
//! 6. render the environment files
//!
//! The first failing step ends the run. Resources created by earlier steps are
//! left in place.
//!
//! With a [`Tracer`] attached the run is exported as one request and every
//! step as a dependency of it.

use crate::errors::{ProvisionError, ProvisionResult};
use crate::management::{
    ArmClient, DeploymentOutcome, DeploymentPolling, InsightsKeys, SelectedSubscription,
    StorageKeys, TemplateDeployment,
};
use crate::suffix::{DEFAULT_SUFFIX_LENGTH, Suffix};
use crate::telemetry::{Span, SpanKind, Tracer};
use crate::template::{
    EnvFileRenderer, EnvFileSpec, ParametersFile, Placeholder, RenderedEnvFile,
    SubstitutionValues, load_json, substitute, unresolved_placeholders,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

pub const DEFAULT_RESOURCE_GROUP: &str = "azmon-{SUFFIX}";
pub const DEFAULT_INSIGHTS_NAME: &str = "appi-{SUFFIX}";
pub const DEFAULT_STORAGE_ACCOUNT_NAME: &str = "st{SUFFIX}";
pub const DEFAULT_INSIGHTS_OUTPUT: &str = "appInsightsName";
pub const DEFAULT_STORAGE_OUTPUT: &str = "storageAccountName";
pub const TRACE_COMPONENT: &str = "azmon-provisioner";

/// Everything a run needs to know up front.
#[derive(Clone)]
pub struct DeploymentPlan {
    /// Explicit subscription; `None` requires exactly one enabled subscription
    pub subscription_id: Option<String>,
    pub location: String,
    /// Resource group name, may contain `{SUFFIX}`
    pub resource_group: String,
    pub tags: HashMap<String, String>,
    pub template_path: PathBuf,
    pub parameters_path: PathBuf,
    pub write_parameters_in_place: bool,
    /// Fallback component name when the template has no matching output
    pub insights_name: String,
    pub insights_output: String,
    pub storage_account_name: String,
    pub storage_output: String,
    pub env_files: Vec<EnvFileSpec>,
    pub db_user: String,
    pub db_password: String,
    pub polling: DeploymentPolling,
    /// Fixed suffix; one is generated when absent
    pub suffix: Option<Suffix>,
    pub suffix_length: usize,
    pub dry_run: bool,
}

impl DeploymentPlan {
    pub fn new(
        template_path: impl Into<PathBuf>,
        parameters_path: impl Into<PathBuf>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: None,
            location: location.into(),
            resource_group: DEFAULT_RESOURCE_GROUP.to_string(),
            tags: HashMap::new(),
            template_path: template_path.into(),
            parameters_path: parameters_path.into(),
            write_parameters_in_place: true,
            insights_name: DEFAULT_INSIGHTS_NAME.to_string(),
            insights_output: DEFAULT_INSIGHTS_OUTPUT.to_string(),
            storage_account_name: DEFAULT_STORAGE_ACCOUNT_NAME.to_string(),
            storage_output: DEFAULT_STORAGE_OUTPUT.to_string(),
            env_files: Vec::new(),
            db_user: String::new(),
            db_password: String::new(),
            polling: DeploymentPolling::default(),
            suffix: None,
            suffix_length: DEFAULT_SUFFIX_LENGTH,
            dry_run: false,
        }
    }

    /// Database credentials are written verbatim, so they must be present.
    fn check_credentials(&self) -> ProvisionResult<()> {
        for (placeholder, value) in [
            (Placeholder::DbUser, &self.db_user),
            (Placeholder::DbPassword, &self.db_password),
        ] {
            if value.trim().is_empty() {
                return Err(ProvisionError::EmptyValue(placeholder.token()));
            }
        }
        Ok(())
    }

    fn resolve_suffix(&self) -> ProvisionResult<Suffix> {
        match &self.suffix {
            Some(suffix) => Ok(suffix.clone()),
            None => Suffix::generate(self.suffix_length),
        }
    }
}

impl std::fmt::Debug for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentPlan")
            .field("subscription_id", &self.subscription_id)
            .field("location", &self.location)
            .field("resource_group", &self.resource_group)
            .field("template_path", &self.template_path)
            .field("parameters_path", &self.parameters_path)
            .field("write_parameters_in_place", &self.write_parameters_in_place)
            .field("env_files", &self.env_files)
            .field("db_user", &self.db_user)
            .field("db_password", &"<redacted>")
            .field("suffix", &self.suffix)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    pub suffix: Suffix,
    pub subscription: Option<SelectedSubscription>,
    pub resource_group: String,
    pub deployment_name: String,
    pub insights_component: String,
    pub storage_account: String,
    pub parameters_written: bool,
    pub env_files: Vec<RenderedEnvFile>,
    pub dry_run: bool,
}

impl DeploymentReport {
    /// Placeholders left in any of the written environment files.
    pub fn unresolved(&self) -> Vec<String> {
        let mut all: Vec<String> = Vec::new();
        for file in &self.env_files {
            for token in &file.unresolved {
                if !all.contains(token) {
                    all.push(token.clone());
                }
            }
        }
        all
    }
}

pub struct Deployer {
    arm: ArmClient,
    tracer: Tracer,
}

impl Deployer {
    pub fn new(arm: ArmClient) -> Self {
        Self {
            arm,
            tracer: Tracer::disabled(TRACE_COMPONENT),
        }
    }

    /// Reports the run as a request and each step as a dependency.
    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    pub async fn run(&self, plan: &DeploymentPlan) -> ProvisionResult<DeploymentReport> {
        let mut request = self.tracer.start_span("deploy", SpanKind::Server);
        request.set_property("location", plan.location.clone());
        request.set_property("dry_run", plan.dry_run.to_string());

        let result = self.run_steps(plan, &request).await;
        match &result {
            Ok(report) => {
                request.set_property("suffix", report.suffix.to_string());
                request.set_property("resource_group", report.resource_group.clone());
            }
            Err(e) => request.set_property("error", e.to_string()),
        }
        request.end(result.is_ok());
        result
    }

    async fn run_steps(
        &self,
        plan: &DeploymentPlan,
        request: &Span,
    ) -> ProvisionResult<DeploymentReport> {
        let started = Instant::now();
        let suffix = plan.resolve_suffix()?;
        let resource_group = expand_name(&plan.resource_group, &suffix)?;
        let deployment_name = deployment_name(&suffix);

        log::info!(
            "Starting deployment run with suffix '{suffix}' into resource group '{resource_group}'"
        );

        // Local inputs are checked before anything is created in Azure
        plan.check_credentials()?;
        let renderer = EnvFileRenderer::new(plan.env_files.clone());
        renderer.check_templates().await?;
        let template = load_json(&plan.template_path).await?;
        let parameters_file = ParametersFile::load(&plan.parameters_path).await?;
        let prepared = parameters_file.prepare(&suffix)?;

        if plan.dry_run {
            return self.dry_run_report(plan, suffix, resource_group, deployment_name);
        }

        let arm_host = self.arm.base_url();

        log::info!("[1/6] Authenticating");
        let auth_type = traced(
            request.child("authenticate", SpanKind::Client),
            self.arm.authenticate(),
        )
        .await?;
        log::info!("[1/6] Authenticated with {auth_type}");

        log::info!("[2/6] Selecting subscription");
        let subscription = traced(
            step(request, "select subscription", arm_host),
            self.arm.select_subscription(plan.subscription_id.as_deref()),
        )
        .await?;

        log::info!("[3/6] Creating resource group '{resource_group}'");
        traced(
            step(request, "create resource group", arm_host),
            self.arm.create_resource_group(
                &subscription.subscription_id,
                &resource_group,
                &plan.location,
                &plan.tags,
            ),
        )
        .await?;

        log::info!("[4/6] Deploying template as '{deployment_name}'");
        let mut parameters_written = false;
        if plan.write_parameters_in_place {
            prepared.write_in_place(&parameters_file).await?;
            parameters_written = true;
        }
        let deployment = TemplateDeployment {
            name: deployment_name.clone(),
            template,
            parameters: prepared.parameters,
        };
        let outcome = traced(
            step(request, "deploy template", arm_host),
            self.arm.deploy_template(
                &subscription.subscription_id,
                &resource_group,
                &deployment,
                plan.polling,
            ),
        )
        .await?;

        log::info!("[5/6] Retrieving keys");
        let insights_component =
            resource_name(&outcome, &plan.insights_output, &plan.insights_name, &suffix)?;
        let storage_account = resource_name(
            &outcome,
            &plan.storage_output,
            &plan.storage_account_name,
            &suffix,
        )?;
        let insights = traced(
            step(request, "get insights keys", arm_host),
            self.arm.get_insights_keys(
                &subscription.subscription_id,
                &resource_group,
                &insights_component,
            ),
        )
        .await?;
        let storage = traced(
            step(request, "list storage keys", arm_host),
            self.arm.get_storage_keys(
                &subscription.subscription_id,
                &resource_group,
                &storage_account,
            ),
        )
        .await?;

        log::info!("[6/6] Writing environment files");
        let values = substitution_values(plan, &suffix, &insights, &storage)?;
        let env_files = traced(
            request.child("write env files", SpanKind::Internal),
            renderer.render_all(&values),
        )
        .await?;

        log::info!(
            "Deployment run finished in {:.1}s",
            started.elapsed().as_secs_f64()
        );

        Ok(DeploymentReport {
            suffix,
            subscription: Some(subscription),
            resource_group,
            deployment_name,
            insights_component,
            storage_account,
            parameters_written,
            env_files,
            dry_run: false,
        })
    }

    fn dry_run_report(
        &self,
        plan: &DeploymentPlan,
        suffix: Suffix,
        resource_group: String,
        deployment_name: String,
    ) -> ProvisionResult<DeploymentReport> {
        let insights_component = expand_name(&plan.insights_name, &suffix)?;
        let storage_account = expand_name(&plan.storage_account_name, &suffix)?;

        log::info!(
            "Dry run: would deploy '{deployment_name}' to '{resource_group}' in {} against {}",
            plan.location,
            self.arm.base_url()
        );

        Ok(DeploymentReport {
            suffix,
            subscription: None,
            resource_group,
            deployment_name,
            insights_component,
            storage_account,
            parameters_written: false,
            env_files: Vec::new(),
            dry_run: true,
        })
    }
}

/// Collects the values written into the environment files.
pub fn substitution_values(
    plan: &DeploymentPlan,
    suffix: &Suffix,
    insights: &InsightsKeys,
    storage: &StorageKeys,
) -> ProvisionResult<SubstitutionValues> {
    SubstitutionValues::new()
        .with(Placeholder::InsightsKey, insights.instrumentation_key.as_str())?
        .with(
            Placeholder::InsightsConnectionString,
            insights.connection_string.as_str(),
        )?
        .with(Placeholder::Suffix, suffix.as_str())?
        .with(Placeholder::DbUser, plan.db_user.as_str())?
        .with(Placeholder::DbPassword, plan.db_password.as_str())?
        .with(
            Placeholder::StorageConnectionString,
            storage.connection_string(),
        )
}

fn expand_name(template: &str, suffix: &Suffix) -> ProvisionResult<String> {
    let values = SubstitutionValues::new().with(Placeholder::Suffix, suffix.as_str())?;
    let name = substitute(template, &values);
    let unresolved = unresolved_placeholders(&name);
    if !unresolved.is_empty() {
        return Err(ProvisionError::Configuration(format!(
            "resource name '{template}' may only use {}, found {}",
            Placeholder::Suffix,
            unresolved.join(", ")
        )));
    }
    if name.trim().is_empty() {
        return Err(ProvisionError::Configuration(
            "resource name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

/// Prefers the name the template reports over the configured pattern.
fn resource_name(
    outcome: &DeploymentOutcome,
    output: &str,
    fallback: &str,
    suffix: &Suffix,
) -> ProvisionResult<String> {
    match outcome.output_str(output).filter(|name| !name.is_empty()) {
        Some(name) => Ok(name.to_string()),
        None => {
            log::debug!("Deployment has no '{output}' output, using configured name");
            expand_name(fallback, suffix)
        }
    }
}

fn step(request: &Span, name: &str, arm_host: &str) -> Span {
    let mut span = request.child(name, SpanKind::Client);
    span.set_target(arm_host);
    span
}

/// Awaits `work` inside `span` and ends the span with its outcome.
async fn traced<T>(
    mut span: Span,
    work: impl Future<Output = ProvisionResult<T>>,
) -> ProvisionResult<T> {
    let result = work.await;
    if let Err(e) = &result {
        span.set_property("error", e.to_string());
    }
    span.end(result.is_ok());
    result
}

fn deployment_name(suffix: &Suffix) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("azmon-{suffix}-{}", &id[..8])
}
