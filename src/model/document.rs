//! Top-level documents: the deploy spec consumed by `apply` and the app spec it produces.

use super::resource::{AppSpecResource, DeploySpecResource, ResourceList};
use serde::{Deserialize, Serialize};

/// Target-state document. Inside a deploy spec it is the skeleton to fill in;
/// returned from reconciliation it is the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    /// Carried exactly as written: `version: 1.10` stays `"1.10"`.
    #[serde(default)]
    pub version: String,
    #[serde(rename = "Resources", default)]
    pub resources: ResourceList<AppSpecResource>,
}

impl AppSpec {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            resources: ResourceList::new(),
        }
    }

    pub fn with_resource(mut self, name: impl Into<String>, resource: impl Into<AppSpecResource>) -> Self {
        self.resources.push(name, resource);
        self
    }
}

/// Desired-state document handed to `apply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploySpec {
    #[serde(default)]
    pub version: String,
    #[serde(rename = "Resources", default)]
    pub resources: ResourceList<DeploySpecResource>,
    #[serde(rename = "AppSpec")]
    pub app_spec: AppSpec,
}

impl DeploySpec {
    pub fn new(version: impl Into<String>, app_spec: AppSpec) -> Self {
        Self {
            version: version.into(),
            resources: ResourceList::new(),
            app_spec,
        }
    }

    pub fn with_resource(
        mut self,
        name: impl Into<String>,
        resource: impl Into<DeploySpecResource>,
    ) -> Self {
        self.resources.push(name, resource);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    const DOCUMENT: &str = r#"
version: 0.0
Resources:
  - myFunction:
      FunctionCode:
        S3Bucket: artifacts
        S3Key: my-function/1234.zip
      FunctionConfiguration:
        Environment:
          LOG_LEVEL: debug
  - TargetService:
      Type: AWS::ECS::Service
      RegisterTaskDefinitionInput:
        Family: web
        NetworkMode: awsvpc
        RequiresCompatibilities: [FARGATE]
        ContainerDefinitions:
          - Name: web
            Image: nginx:1.27
            Essential: true
            PortMappings:
              - ContainerPort: 80
AppSpec:
  version: "0.0"
  Resources:
    - myFunction:
        Type: AWS::Lambda::Function
        Properties:
          Name: my-function
          Alias: release
    - TargetService:
        Type: AWS::ECS::Service
        Properties:
          TaskDefinition: ""
"#;

    #[test]
    fn test_parse_deploy_spec() {
        let spec: DeploySpec = serde_yaml::from_str(DOCUMENT).unwrap();
        assert_eq!(spec.version, "0.0");
        assert_eq!(spec.resources.names(), vec!["myFunction", "TargetService"]);

        let function = match spec.resources.get("myFunction") {
            Some(DeploySpecResource::Function(function)) => function,
            other => panic!("Expected a function resource, got {other:?}"),
        };
        assert_eq!(function.function_code.location(), "s3://artifacts/my-function/1234.zip");
        assert_eq!(function.environment().unwrap()["LOG_LEVEL"], "debug");

        let service = match spec.resources.get("TargetService") {
            Some(DeploySpecResource::Service(service)) => service,
            other => panic!("Expected a service resource, got {other:?}"),
        };
        let registration = &service.register_task_definition_input;
        assert_eq!(registration.family, "web");
        assert_eq!(registration.requires_compatibilities, vec!["FARGATE"]);
        assert_eq!(registration.container_definitions[0].port_mappings[0].container_port, Some(80));

        assert_eq!(spec.app_spec.version, "0.0");
        let kinds: Vec<_> = spec.app_spec.resources.iter().map(|e| e.resource.kind()).collect();
        assert_eq!(kinds, vec![Some(ResourceKind::Function), Some(ResourceKind::Service)]);
    }

    #[test]
    fn test_missing_app_spec_is_rejected() {
        let err = serde_yaml::from_str::<DeploySpec>("version: '1'\nResources: []\n").unwrap_err();
        assert!(err.to_string().contains("AppSpec"), "{err}");
    }

    #[test]
    fn test_non_scalar_version_is_rejected() {
        let yaml = "version: [1]\nAppSpec:\n  version: '1'\n";
        assert!(serde_yaml::from_str::<DeploySpec>(yaml).is_err());
    }

    #[test]
    fn test_version_keeps_literal_text() {
        let yaml = "version: 1.10\nAppSpec:\n  version: 2.0\n";
        let spec: DeploySpec = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(spec.version, "1.10");
        assert_eq!(spec.app_spec.version, "2.0");
    }

    #[test]
    fn test_missing_version_is_empty() {
        let spec: DeploySpec = serde_yaml::from_str("AppSpec: {}\n").unwrap();
        assert_eq!(spec.version, "");
        assert_eq!(spec.app_spec.version, "");
    }
}
