use super::placeholders::{Placeholder, SubstitutionValues, substitute};
use crate::errors::{ProvisionError, ProvisionResult};
use crate::suffix::Suffix;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// An ARM parameters file that still contains the `{SUFFIX}` token.
#[derive(Debug, Clone)]
pub struct ParametersFile {
    path: PathBuf,
    content: String,
}

/// Parameters after the suffix has been applied.
#[derive(Debug, Clone)]
pub struct PreparedParameters {
    /// Full file text with the suffix substituted
    pub content: String,
    /// The `parameters` object to send with the deployment
    pub parameters: Value,
}

impl ParametersFile {
    pub async fn load(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProvisionError::io(path, e))?;
        Ok(Self::from_content(path, content))
    }

    pub fn from_content(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains_suffix_token(&self) -> bool {
        self.content.contains(&Placeholder::Suffix.token())
    }

    pub fn prepare(&self, suffix: &Suffix) -> ProvisionResult<PreparedParameters> {
        if !self.contains_suffix_token() {
            log::warn!(
                "{} has no {} token; resource names will not carry the suffix",
                self.path.display(),
                Placeholder::Suffix
            );
        }

        let values = SubstitutionValues::new().with(Placeholder::Suffix, suffix.as_str())?;
        let content = substitute(&self.content, &values);

        let document: Value = serde_json::from_str(&content)
            .map_err(|e| ProvisionError::json(self.path.display().to_string(), e))?;
        let parameters = extract_parameters(document).ok_or_else(|| ProvisionError::Template {
            path: self.path.display().to_string(),
            reason: "parameters must be a JSON object".to_string(),
        })?;

        Ok(PreparedParameters {
            content,
            parameters,
        })
    }
}

impl PreparedParameters {
    /// Overwrites the original parameters file with the substituted text.
    pub async fn write_in_place(&self, file: &ParametersFile) -> ProvisionResult<()> {
        tokio::fs::write(file.path(), &self.content)
            .await
            .map_err(|e| ProvisionError::io(file.path(), e))?;
        log::info!("Wrote suffixed parameters back to {}", file.path().display());
        Ok(())
    }
}

/// Accepts both a full deployment parameters document and a bare parameter map.
fn extract_parameters(document: Value) -> Option<Value> {
    match document {
        Value::Object(mut map) => match map.remove("parameters") {
            Some(parameters @ Value::Object(_)) => Some(parameters),
            Some(_) => None,
            None => Some(Value::Object(map)),
        },
        _ => None,
    }
}

/// Reads a JSON document such as the ARM template.
pub async fn load_json(path: impl AsRef<Path>) -> ProvisionResult<Value> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ProvisionError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| ProvisionError::json(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PARAMETERS: &str = r#"{
  "$schema": "https://schema.management.azure.com/schemas/2019-04-01/deploymentParameters.json#",
  "contentVersion": "1.0.0.0",
  "parameters": {
    "appInsightsName": { "value": "appi-{SUFFIX}" },
    "storageAccountName": { "value": "st{SUFFIX}" }
  }
}"#;

    #[test]
    fn test_prepare_substitutes_suffix_and_extracts_parameters() {
        let file = ParametersFile::from_content("parameters.json", PARAMETERS);
        let prepared = file.prepare(&Suffix::parse("abc123").unwrap()).unwrap();

        assert_eq!(
            prepared.parameters,
            json!({
                "appInsightsName": {"value": "appi-abc123"},
                "storageAccountName": {"value": "stabc123"}
            })
        );
        assert!(!prepared.content.contains("{SUFFIX}"));
        assert!(prepared.content.contains("$schema"));
    }

    #[test]
    fn test_bare_parameter_map_is_accepted() {
        let file = ParametersFile::from_content("p.json", r#"{"name": {"value": "x{SUFFIX}"}}"#);
        let prepared = file.prepare(&Suffix::parse("s1").unwrap()).unwrap();
        assert_eq!(prepared.parameters, json!({"name": {"value": "xs1"}}));
    }

    #[test]
    fn test_non_object_parameters_are_rejected() {
        let file = ParametersFile::from_content("p.json", r#"{"parameters": [1, 2]}"#);
        let err = file.prepare(&Suffix::parse("s1").unwrap()).unwrap_err();
        assert!(matches!(err, ProvisionError::Template { .. }));
    }

    #[tokio::test]
    async fn test_write_in_place_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parameters.json");
        tokio::fs::write(&path, PARAMETERS).await.unwrap();

        let file = ParametersFile::load(&path).await.unwrap();
        assert!(file.contains_suffix_token());
        let prepared = file.prepare(&Suffix::parse("zz9").unwrap()).unwrap();
        prepared.write_in_place(&file).await.unwrap();

        let reloaded = ParametersFile::load(&path).await.unwrap();
        assert!(!reloaded.contains_suffix_token());
        assert!(
            tokio::fs::read_to_string(&path)
                .await
                .unwrap()
                .contains("stzz9")
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_reports_path() {
        let err = load_json("/definitely/not/here/template.json")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here/template.json"));
    }
}
