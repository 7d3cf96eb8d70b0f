use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use provisioner::template::verify_env_file;

/// Fails when any generated env file is missing or still has placeholders.
pub async fn run(config: &AppConfig) -> AppResult<()> {
    let mut unresolved: Vec<String> = Vec::new();

    for spec in config.env_files() {
        let tokens = verify_env_file(&spec.output).await?;
        if tokens.is_empty() {
            println!("{}: ok", spec.output.display());
        } else {
            println!("{}: unresolved {}", spec.output.display(), tokens.join(", "));
            for token in tokens {
                if !unresolved.contains(&token) {
                    unresolved.push(token);
                }
            }
        }
    }

    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(AppError::Unresolved(unresolved))
    }
}
