use azmon::AppError;
use azmon::cli::RenderArgs;
use azmon::commands::{render, verify};
use azmon::config::{AppConfig, load_config};
use claims::{assert_err, assert_ok};
use std::path::Path;
use tempfile::TempDir;

const APP_TEMPLATE: &str = "\
APPINSIGHTS_INSTRUMENTATIONKEY={INSIGHTS_KEY}
APPLICATIONINSIGHTS_CONNECTION_STRING={INSIGHTS_CONNECTION_STRING}
DB_USER={DBUSER}
DB_PASSWORD={DBPASSWORD}
";

const TESTS_TEMPLATE: &str = "\
SUFFIX={SUFFIX}
STORAGE_CONNECTION_STRING={STORAGE_CONNECTION_STRING}
";

fn write_config(dir: &Path, password: &str) -> AppConfig {
    std::fs::create_dir_all(dir.join("infra/env")).unwrap();
    std::fs::write(dir.join("infra/env/app.env.template"), APP_TEMPLATE).unwrap();
    std::fs::write(dir.join("infra/env/tests.env.template"), TESTS_TEMPLATE).unwrap();

    let config_path = dir.join("azmon.toml");
    let body = format!(
        r#"
[database]
user = "monitor"
password = "{password}"

[[env_files]]
template = "{root}/infra/env/app.env.template"
output = "{root}/.env"

[[env_files]]
template = "{root}/infra/env/tests.env.template"
output = "{root}/tests/.env"
"#,
        root = dir.display()
    );
    std::fs::write(&config_path, body).unwrap();

    load_config(Some(&config_path)).into_result().unwrap()
}

fn write_values(dir: &Path, json: &str) -> RenderArgs {
    let values = dir.join("values.json");
    std::fs::write(&values, json).unwrap();
    RenderArgs { values }
}

#[tokio::test]
async fn render_fills_every_placeholder_and_verify_passes() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "s3cret!");
    let args = write_values(
        dir.path(),
        r#"{
            "INSIGHTS_KEY": "00000000-1111-2222-3333-444444444444",
            "INSIGHTS_CONNECTION_STRING": "InstrumentationKey=00000000-1111-2222-3333-444444444444",
            "SUFFIX": "abc123",
            "STORAGE_CONNECTION_STRING": "DefaultEndpointsProtocol=https;AccountName=stabc123;AccountKey=a==;EndpointSuffix=core.windows.net"
        }"#,
    );

    assert_ok!(render::run(&args, &config).await);

    let app_env = std::fs::read_to_string(dir.path().join(".env")).unwrap();
    assert!(app_env.contains("APPINSIGHTS_INSTRUMENTATIONKEY=00000000-1111-2222-3333-444444444444"));
    assert!(app_env.contains("DB_USER=monitor"));
    assert!(app_env.contains("DB_PASSWORD=s3cret!"));

    let tests_env = std::fs::read_to_string(dir.path().join("tests/.env")).unwrap();
    assert!(tests_env.contains("SUFFIX=abc123"));
    assert!(tests_env.contains("AccountKey=a==;"));

    assert_ok!(verify::run(&config).await);
}

#[tokio::test]
async fn missing_values_are_reported_as_unresolved() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "");
    let args = write_values(dir.path(), r#"{"SUFFIX": "abc123"}"#);

    let err = render::run(&args, &config).await.unwrap_err();
    match err {
        AppError::Unresolved(tokens) => {
            assert!(tokens.contains(&"{INSIGHTS_KEY}".to_string()));
            assert!(tokens.contains(&"{DBPASSWORD}".to_string()));
            assert!(!tokens.contains(&"{SUFFIX}".to_string()));
        }
        other => panic!("expected unresolved placeholders, got {other}"),
    }

    // Files are still written so the gaps can be fixed by hand
    assert!(dir.path().join(".env").exists());
    assert_err!(verify::run(&config).await);
}

#[tokio::test]
async fn verify_fails_before_anything_was_rendered() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "pw");

    assert_err!(verify::run(&config).await);
}

#[tokio::test]
async fn unknown_placeholder_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "pw");
    let args = write_values(dir.path(), r#"{"NOT_A_PLACEHOLDER": "x"}"#);

    let err = render::run(&args, &config).await.unwrap_err();
    assert!(err.to_string().contains("Unknown placeholder"));
    assert!(!dir.path().join(".env").exists());
}
