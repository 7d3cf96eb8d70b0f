use crate::cli::InitArgs;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use std::path::Path;

const HEADER: &str = "# azmon configuration\n\
# Every value can be overridden from the environment using `__` between\n\
# section and key, e.g. DATABASE__PASSWORD or AZURE__SUBSCRIPTION_ID.\n\n";

pub async fn run(args: &InitArgs) -> AppResult<()> {
    write_default_config(&args.output, args.force).await?;
    println!("Wrote {}", args.output.display());
    Ok(())
}

pub async fn write_default_config(path: &Path, force: bool) -> AppResult<()> {
    if !force && tokio::fs::try_exists(path).await.map_err(|e| AppError::io(path, e))? {
        return Err(AppError::Config(format!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        )));
    }

    let body = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| AppError::Config(format!("Failed to serialize default config: {e}")))?;
    tokio::fs::write(path, format!("{HEADER}{body}"))
        .await
        .map_err(|e| AppError::io(path, e))
}
