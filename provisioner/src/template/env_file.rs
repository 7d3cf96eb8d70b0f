use super::placeholders::{SubstitutionValues, substitute, unresolved_placeholders};
use crate::errors::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One environment-file template and where its rendered copy goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvFileSpec {
    pub template: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEnvFile {
    pub output: PathBuf,
    /// Placeholders still present in the written file
    pub unresolved: Vec<String>,
}

impl RenderedEnvFile {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Renders environment templates into their output files.
#[derive(Debug, Clone)]
pub struct EnvFileRenderer {
    specs: Vec<EnvFileSpec>,
}

impl EnvFileRenderer {
    pub fn new(specs: Vec<EnvFileSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[EnvFileSpec] {
        &self.specs
    }

    /// Fails before writing anything if a template is missing.
    pub async fn check_templates(&self) -> ProvisionResult<()> {
        for spec in &self.specs {
            if !tokio::fs::try_exists(&spec.template)
                .await
                .map_err(|e| ProvisionError::io(&spec.template, e))?
            {
                return Err(ProvisionError::Template {
                    path: spec.template.display().to_string(),
                    reason: "template file does not exist".to_string(),
                });
            }
        }
        Ok(())
    }

    pub async fn render_all(&self, values: &SubstitutionValues) -> ProvisionResult<Vec<RenderedEnvFile>> {
        let mut rendered = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            rendered.push(render_env_file(spec, values).await?);
        }
        Ok(rendered)
    }
}

pub async fn render_env_file(
    spec: &EnvFileSpec,
    values: &SubstitutionValues,
) -> ProvisionResult<RenderedEnvFile> {
    let template = tokio::fs::read_to_string(&spec.template)
        .await
        .map_err(|e| ProvisionError::io(&spec.template, e))?;

    let content = substitute(&template, values);
    let unresolved = unresolved_placeholders(&content);

    if let Some(parent) = spec.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ProvisionError::io(parent, e))?;
    }
    tokio::fs::write(&spec.output, content)
        .await
        .map_err(|e| ProvisionError::io(&spec.output, e))?;

    if unresolved.is_empty() {
        log::info!(
            "Rendered {} -> {}",
            spec.template.display(),
            spec.output.display()
        );
    } else {
        log::warn!(
            "Rendered {} with unresolved placeholders: {}",
            spec.output.display(),
            unresolved.join(", ")
        );
    }

    Ok(RenderedEnvFile {
        output: spec.output.clone(),
        unresolved,
    })
}

/// Reports unresolved placeholders in an already rendered file.
pub async fn verify_env_file(path: &Path) -> ProvisionResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProvisionError::io(path, e))?;
    Ok(unresolved_placeholders(&content))
}
