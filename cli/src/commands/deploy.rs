use crate::cli::DeployArgs;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use provisioner::auth::{DeviceCodeCallback, DeviceCodeInfo, TokenSource, create_auth_provider};
use provisioner::management::ArmClient;
use provisioner::deployer::TRACE_COMPONENT;
use provisioner::suffix::Suffix;
use provisioner::telemetry::AppLogger;
use provisioner::{Deployer, DeploymentPlan, DeploymentReport};
use std::sync::Arc;

pub async fn run(args: &DeployArgs, config: &AppConfig) -> AppResult<()> {
    config
        .validate_for_deploy()
        .map_err(AppError::InvalidConfig)?;
    let plan = build_plan(args, config)?;

    let http = reqwest::Client::new();
    let provider = create_auth_provider(
        config.azure_ad(),
        http.clone(),
        Some(device_code_prompt(config.azure().open_browser)),
    )?;
    let arm = ArmClient::with_base_url(
        http,
        TokenSource::new(provider),
        config.azure().management_url(),
    );

    let mut deployer = Deployer::new(arm);
    if let Some(app) = AppLogger::global() {
        deployer = deployer.with_tracer(app.get_tracer(TRACE_COMPONENT, None));
    }
    let report = deployer.run(&plan).await?;
    println!("{}", summary(&report));

    let unresolved = report.unresolved();
    if !unresolved.is_empty() {
        return Err(AppError::Unresolved(unresolved));
    }
    Ok(())
}

/// Applies command line overrides to the configured plan.
pub fn build_plan(args: &DeployArgs, config: &AppConfig) -> AppResult<DeploymentPlan> {
    let mut plan = config.deployment_plan();

    if let Some(suffix) = &args.suffix {
        plan.suffix = Some(Suffix::parse(suffix)?);
    }
    if let Some(subscription) = &args.subscription {
        plan.subscription_id = Some(subscription.clone());
    }
    if let Some(location) = &args.location {
        if location.trim().is_empty() {
            return Err(AppError::Config("--location must not be empty".to_string()));
        }
        plan.location = location.trim().to_string();
    }
    if args.no_write_parameters {
        plan.write_parameters_in_place = false;
    }
    plan.dry_run = args.dry_run;

    Ok(plan)
}

fn device_code_prompt(open_browser: bool) -> DeviceCodeCallback {
    Arc::new(move |info: &DeviceCodeInfo| {
        eprintln!("{}", info.message);
        if open_browser {
            if let Err(e) = open::that(&info.verification_uri) {
                log::warn!("Could not open {}: {e}", info.verification_uri);
            }
        }
    })
}

pub fn summary(report: &DeploymentReport) -> String {
    let mut lines = Vec::new();
    if report.dry_run {
        lines.push("Dry run, nothing was created.".to_string());
    }
    lines.push(format!("Suffix:              {}", report.suffix));
    if let Some(subscription) = &report.subscription {
        lines.push(format!(
            "Subscription:        {} ({})",
            subscription.display_name, subscription.subscription_id
        ));
    }
    lines.push(format!("Resource group:      {}", report.resource_group));
    lines.push(format!("Deployment:          {}", report.deployment_name));
    lines.push(format!("Application Insights: {}", report.insights_component));
    lines.push(format!("Storage account:     {}", report.storage_account));
    if report.parameters_written {
        lines.push("Parameters file updated with the suffix.".to_string());
    }
    for file in &report.env_files {
        let status = if file.is_complete() {
            "complete".to_string()
        } else {
            format!("unresolved {}", file.unresolved.join(", "))
        };
        lines.push(format!("Wrote {} ({status})", file.output.display()));
    }
    lines.join("\n")
}
