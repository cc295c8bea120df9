//! Schemas for `AWS::Lambda::Function` resources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Location of a deployment package in S3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCode {
    #[serde(rename = "S3Bucket")]
    pub s3_bucket: String,
    #[serde(rename = "S3Key")]
    pub s3_key: String,
}

impl FunctionCode {
    pub fn new(s3_bucket: impl Into<String>, s3_key: impl Into<String>) -> Self {
        Self {
            s3_bucket: s3_bucket.into(),
            s3_key: s3_key.into(),
        }
    }

    /// The `s3://<bucket>/<key>` pointer, used as the published version description.
    pub fn location(&self) -> String {
        format!("s3://{}/{}", self.s3_bucket, self.s3_key)
    }
}

/// Runtime configuration to merge into the function before publishing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionConfiguration {
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// Desired state of a Lambda function, as declared in the deploy spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionDeploySpec {
    pub function_code: FunctionCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_configuration: Option<FunctionConfiguration>,
}

impl FunctionDeploySpec {
    pub fn new(code: FunctionCode) -> Self {
        Self {
            function_code: code,
            function_configuration: None,
        }
    }

    pub fn with_environment<K, V>(mut self, environment: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.function_configuration = Some(FunctionConfiguration {
            environment: environment
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        });
        self
    }

    /// Declared environment variables, if any were declared at all.
    pub fn environment(&self) -> Option<&BTreeMap<String, String>> {
        self.function_configuration
            .as_ref()
            .map(|configuration| &configuration.environment)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionProperties {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub current_version: String,
    #[serde(default)]
    pub target_version: String,
}

/// A Lambda entry of the app spec.
///
/// Before reconciliation `CurrentVersion` and `TargetVersion` are usually empty;
/// afterwards they hold the version the alias pointed at and the freshly published one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionAppSpec {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(rename = "Properties", default)]
    pub properties: FunctionProperties,
}

impl FunctionAppSpec {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            resource_type: super::ResourceKind::Function.tag().to_string(),
            properties: FunctionProperties {
                name: name.into(),
                alias: alias.into(),
                ..FunctionProperties::default()
            },
        }
    }

    /// Copy of this entry with both versions resolved. `Type`, `Name` and `Alias` carry over.
    pub fn with_versions(&self, current: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            properties: FunctionProperties {
                name: self.properties.name.clone(),
                alias: self.properties.alias.clone(),
                current_version: current.into(),
                target_version: target.into(),
            },
        }
    }
}
