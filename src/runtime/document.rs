//! Reading deploy specs and writing app specs as YAML.

use crate::model::{AppSpec, DeploySpec};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid deploy spec")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render app spec")]
    Render(#[source] serde_yaml::Error),
}

/// Reads and parses the deploy spec at `path`.
#[instrument]
pub async fn load_deploy_spec(path: &Path) -> Result<DeploySpec, DocumentError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let spec = parse_deploy_spec(&contents)?;
    debug!(
        resources = spec.resources.len(),
        targets = spec.app_spec.resources.len(),
        "Loaded deploy spec"
    );
    Ok(spec)
}

pub fn parse_deploy_spec(contents: &str) -> Result<DeploySpec, DocumentError> {
    Ok(serde_yaml::from_str(contents)?)
}

pub fn render_app_spec(app_spec: &AppSpec) -> Result<String, DocumentError> {
    serde_yaml::to_string(app_spec).map_err(DocumentError::Render)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FunctionAppSpec;
    use serde_yaml::Value;

    #[test]
    fn test_render_writes_single_key_resource_items() {
        let app_spec = AppSpec::new("0.0")
            .with_resource("Orders", FunctionAppSpec::new("orders-fn", "release").with_versions("3", "4"));

        let rendered: Value = serde_yaml::from_str(&render_app_spec(&app_spec).unwrap()).unwrap();
        let expected: Value = serde_yaml::from_str(
            r#"
version: "0.0"
Resources:
  - Orders:
      Type: AWS::Lambda::Function
      Properties:
        Name: orders-fn
        Alias: release
        CurrentVersion: "3"
        TargetVersion: "4"
"#,
        )
        .unwrap();
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_parse_reports_yaml_errors() {
        let err = parse_deploy_spec("Resources: [").unwrap_err();
        assert!(matches!(err, DocumentError::Yaml(_)));
    }

    #[tokio::test]
    async fn test_load_reports_missing_file_path() {
        let err = load_deploy_spec(Path::new("/nonexistent/deployspec.yaml"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to read /nonexistent/deployspec.yaml");
    }
}
