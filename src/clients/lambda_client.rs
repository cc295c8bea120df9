//! # Lambda Client
//!
//! [`LambdaApi`] is the capability the function reconciler calls against. It exposes
//! exactly the Lambda operations a deployment needs. [`AwsLambdaClient`] binds it to the
//! AWS SDK; tests bind it to [`MockLambda`](crate::clients::mock::MockLambda).
use crate::clients::ProviderError;
use crate::model::FunctionCode;
use async_trait::async_trait;
use aws_sdk_lambda::types::{Environment, LastUpdateStatus};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// How often, and how many times, a function still being updated is polled.
const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(1);
const UPDATE_POLL_ATTEMPTS: u32 = 120;

/// A function code revision, as needed for optimistic-concurrency checks on later calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRevision {
    pub revision_id: String,
    pub code_sha256: String,
}

impl CodeRevision {
    pub fn new(revision_id: impl Into<String>, code_sha256: impl Into<String>) -> Self {
        Self {
            revision_id: revision_id.into(),
            code_sha256: code_sha256.into(),
        }
    }
}

#[async_trait]
pub trait LambdaApi: Send + Sync {
    /// Version the alias currently points at.
    async fn get_alias(&self, function_name: &str, alias: &str) -> Result<String, ProviderError>;

    /// Replace the function code with the package at `code`.
    async fn update_function_code(
        &self,
        function_name: &str,
        code: &FunctionCode,
    ) -> Result<CodeRevision, ProviderError>;

    /// Environment variables of the function's `$LATEST` configuration.
    async fn get_function_environment(
        &self,
        function_name: &str,
    ) -> Result<BTreeMap<String, String>, ProviderError>;

    /// Replace the function's environment variables, guarded by `revision`.
    async fn update_function_environment(
        &self,
        function_name: &str,
        revision: &CodeRevision,
        variables: &BTreeMap<String, String>,
    ) -> Result<CodeRevision, ProviderError>;

    /// Publish `revision` as a new immutable version and return its number.
    async fn publish_version(
        &self,
        function_name: &str,
        revision: &CodeRevision,
        description: &str,
    ) -> Result<String, ProviderError>;
}

fn lambda_error<E>(err: E) -> ProviderError
where
    aws_sdk_lambda::Error: From<E>,
{
    ProviderError::Lambda(Arc::new(aws_sdk_lambda::Error::from(err)))
}

fn code_revision(
    operation: &'static str,
    revision_id: Option<&str>,
    code_sha256: Option<&str>,
) -> Result<CodeRevision, ProviderError> {
    let revision_id = revision_id.ok_or(ProviderError::MissingField {
        operation,
        field: "RevisionId",
    })?;
    let code_sha256 = code_sha256.ok_or(ProviderError::MissingField {
        operation,
        field: "CodeSha256",
    })?;
    Ok(CodeRevision::new(revision_id, code_sha256))
}

/// [`LambdaApi`] backed by the AWS SDK.
#[derive(Clone, Debug)]
pub struct AwsLambdaClient {
    inner: aws_sdk_lambda::Client,
}

impl AwsLambdaClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            inner: aws_sdk_lambda::Client::new(config),
        }
    }

    /// Lambda refuses to touch a function while a previous update is in progress, and
    /// finishing that update moves the function to a new revision id. Wait for it to
    /// settle and return the settled revision, provided its code is still `expected`.
    async fn settled_revision(
        &self,
        function_name: &str,
        expected: &CodeRevision,
    ) -> Result<CodeRevision, ProviderError> {
        for attempt in 1..=UPDATE_POLL_ATTEMPTS {
            let output = self
                .inner
                .get_function_configuration()
                .function_name(function_name)
                .send()
                .await
                .map_err(lambda_error)?;

            match output.last_update_status() {
                Some(LastUpdateStatus::InProgress) => {
                    debug!(attempt, "Function update in progress");
                    tokio::time::sleep(UPDATE_POLL_INTERVAL).await;
                }
                Some(LastUpdateStatus::Failed) => {
                    return Err(ProviderError::lambda(format!(
                        "update of {function_name} failed: {}",
                        output.last_update_status_reason().unwrap_or("no reason given")
                    )));
                }
                _ => {
                    let settled = code_revision(
                        "GetFunctionConfiguration",
                        output.revision_id(),
                        output.code_sha256(),
                    )?;
                    if settled.code_sha256 != expected.code_sha256 {
                        return Err(ProviderError::lambda(format!(
                            "code of {function_name} changed concurrently: expected {}, found {}",
                            expected.code_sha256, settled.code_sha256
                        )));
                    }
                    return Ok(settled);
                }
            }
        }
        Err(ProviderError::lambda(format!(
            "{function_name} was still updating after {UPDATE_POLL_ATTEMPTS} checks"
        )))
    }
}

#[async_trait]
impl LambdaApi for AwsLambdaClient {
    #[instrument(skip(self))]
    async fn get_alias(&self, function_name: &str, alias: &str) -> Result<String, ProviderError> {
        debug!("Sending request");
        let output = self
            .inner
            .get_alias()
            .function_name(function_name)
            .name(alias)
            .send()
            .await
            .map_err(lambda_error)?;
        output
            .function_version()
            .map(str::to_owned)
            .ok_or(ProviderError::MissingField {
                operation: "GetAlias",
                field: "FunctionVersion",
            })
    }

    #[instrument(skip(self))]
    async fn update_function_code(
        &self,
        function_name: &str,
        code: &FunctionCode,
    ) -> Result<CodeRevision, ProviderError> {
        debug!("Sending request");
        let output = self
            .inner
            .update_function_code()
            .function_name(function_name)
            .s3_bucket(&code.s3_bucket)
            .s3_key(&code.s3_key)
            .send()
            .await
            .map_err(lambda_error)?;
        code_revision("UpdateFunctionCode", output.revision_id(), output.code_sha256())
    }

    #[instrument(skip(self))]
    async fn get_function_environment(
        &self,
        function_name: &str,
    ) -> Result<BTreeMap<String, String>, ProviderError> {
        debug!("Sending request");
        let output = self
            .inner
            .get_function_configuration()
            .function_name(function_name)
            .send()
            .await
            .map_err(lambda_error)?;
        Ok(output
            .environment()
            .and_then(|environment| environment.variables())
            .map(|variables| {
                variables
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip(self, variables))]
    async fn update_function_environment(
        &self,
        function_name: &str,
        revision: &CodeRevision,
        variables: &BTreeMap<String, String>,
    ) -> Result<CodeRevision, ProviderError> {
        let settled = self.settled_revision(function_name, revision).await?;
        debug!(revision_id = %settled.revision_id, "Sending request");
        let environment = Environment::builder()
            .set_variables(Some(variables.clone().into_iter().collect()))
            .build();
        let output = self
            .inner
            .update_function_configuration()
            .function_name(function_name)
            .revision_id(settled.revision_id)
            .environment(environment)
            .send()
            .await
            .map_err(lambda_error)?;
        code_revision(
            "UpdateFunctionConfiguration",
            output.revision_id(),
            output.code_sha256(),
        )
    }

    #[instrument(skip(self))]
    async fn publish_version(
        &self,
        function_name: &str,
        revision: &CodeRevision,
        description: &str,
    ) -> Result<String, ProviderError> {
        let settled = self.settled_revision(function_name, revision).await?;
        debug!(revision_id = %settled.revision_id, "Sending request");
        let output = self
            .inner
            .publish_version()
            .function_name(function_name)
            .revision_id(settled.revision_id)
            .code_sha256(settled.code_sha256)
            .description(description)
            .send()
            .await
            .map_err(lambda_error)?;
        output
            .version()
            .map(str::to_owned)
            .ok_or(ProviderError::MissingField {
                operation: "PublishVersion",
                field: "Version",
            })
    }
}
