use crate::cli::RenderArgs;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use provisioner::template::{EnvFileRenderer, Placeholder, SubstitutionValues};
use std::collections::BTreeMap;
use std::path::Path;

/// Renders the configured env files from values kept in a JSON file.
///
/// `{DBUSER}` and `{DBPASSWORD}` fall back to the configured database
/// credentials when the file does not set them.
pub async fn run(args: &RenderArgs, config: &AppConfig) -> AppResult<()> {
    config.validate().map_err(AppError::InvalidConfig)?;

    let values = load_values(&args.values, config).await?;
    log::info!(
        "Rendering {} env file(s) with {} value(s)",
        config.env_files().len(),
        values.len()
    );

    let renderer = EnvFileRenderer::new(config.env_files().to_vec());
    renderer.check_templates().await?;
    let rendered = renderer.render_all(&values).await?;

    let mut unresolved = Vec::new();
    for file in &rendered {
        println!("Wrote {}", file.output.display());
        for token in &file.unresolved {
            if !unresolved.contains(token) {
                unresolved.push(token.clone());
            }
        }
    }

    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(AppError::Unresolved(unresolved))
    }
}

pub async fn load_values(path: &Path, config: &AppConfig) -> AppResult<SubstitutionValues> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::io(path, e))?;
    let named: BTreeMap<String, String> = serde_json::from_str(&content).map_err(|e| {
        AppError::Config(format!(
            "{} must be a JSON object of string values: {e}",
            path.display()
        ))
    })?;

    let mut values = SubstitutionValues::from_named(named)?;
    let database = config.database();
    for (placeholder, fallback) in [
        (Placeholder::DbUser, &database.user),
        (Placeholder::DbPassword, &database.password),
    ] {
        if values.get(placeholder).is_none() && !fallback.trim().is_empty() {
            values.insert(placeholder, fallback.as_str())?;
        }
    }
    Ok(values)
}
