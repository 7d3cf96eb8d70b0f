use azmon::config::{ConfigValidationError, load_config};
use claims::{assert_matches, assert_ok};
use provisioner::auth::AuthType;
use std::io::Write;
use std::path::PathBuf;

fn example_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("config.example.toml")
}

#[test]
fn example_config_loads_and_validates() {
    let config = load_config(Some(&example_config())).into_result().unwrap();

    assert_ok!(config.validate());
    assert_eq!(config.azure_ad().auth_method, AuthType::AzureCli);
    assert_eq!(config.deployment().resource_group, "azmon-{SUFFIX}");
    assert_eq!(config.deployment().tags.get("project").map(String::as_str), Some("azmon"));
    assert_eq!(config.env_files().len(), 2);

    let plan = config.deployment_plan();
    assert_eq!(plan.location, "westeurope");
    assert_eq!(plan.storage_account_name, "st{SUFFIX}");
    assert!(plan.suffix.is_none());
}

#[test]
fn example_config_needs_a_database_password_to_deploy() {
    let config = load_config(Some(&example_config())).into_result().unwrap();
    if !config.database().password.is_empty() {
        // DATABASE__PASSWORD is set in this environment
        return;
    }

    let errors = config.validate_for_deploy().unwrap_err();
    assert!(errors.contains(&ConfigValidationError::MissingDatabaseField("password")));
}

#[test]
fn every_problem_is_reported_at_once() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[azure]
location = " "

[azure_ad]
auth_method = "client_credentials"
tenant_id = "tenant"

[deployment]
suffix_length = 40
poll_interval_secs = 0

[[env_files]]
template = "same.env"
output = "same.env"
"#
    )
    .unwrap();

    let config = load_config(Some(file.path())).into_result().unwrap();
    let errors = config.validate().unwrap_err();

    assert!(errors.contains(&ConfigValidationError::EmptyLocation));
    assert!(errors.iter().any(|e| matches!(e, ConfigValidationError::SuffixLength { configured: 40, .. })));
    assert!(errors.iter().any(|e| matches!(e, ConfigValidationError::Polling { interval_secs: 0, .. })));
    assert!(errors.contains(&ConfigValidationError::OutputOverwritesTemplate(PathBuf::from("same.env"))));
    assert!(errors.contains(&ConfigValidationError::MissingAuthField {
        method: "client_credentials",
        field: "client_id",
    }));
    assert!(errors.contains(&ConfigValidationError::MissingAuthField {
        method: "client_credentials",
        field: "client_secret",
    }));
}

#[test]
fn malformed_file_is_a_load_error() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "[deployment\nsuffix = ").unwrap();

    assert_matches!(
        load_config(Some(file.path())).into_result(),
        Err(azmon::AppError::Config(_))
    );
}
