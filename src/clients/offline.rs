//! # Offline Provider
//!
//! [`Offline`] stands in for both providers when no AWS configuration is loaded, as in a
//! dry run. Reconcilers never call a provider in a dry run; if one ever does, the call
//! fails instead of reaching AWS.

use crate::clients::{CodeRevision, EcsApi, LambdaApi, ProviderError};
use crate::model::{FunctionCode, TaskDefinitionRegistration};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::error;

const NOT_CONFIGURED: &str = "no AWS configuration is loaded in a dry run";

/// [`LambdaApi`] and [`EcsApi`] that refuse every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl Offline {
    fn refuse(operation: &str) {
        error!(operation, "Provider called without AWS configuration");
    }
}

#[async_trait]
impl LambdaApi for Offline {
    async fn get_alias(&self, _function_name: &str, _alias: &str) -> Result<String, ProviderError> {
        Self::refuse("GetAlias");
        Err(ProviderError::lambda(NOT_CONFIGURED))
    }

    async fn update_function_code(
        &self,
        _function_name: &str,
        _code: &FunctionCode,
    ) -> Result<CodeRevision, ProviderError> {
        Self::refuse("UpdateFunctionCode");
        Err(ProviderError::lambda(NOT_CONFIGURED))
    }

    async fn get_function_environment(
        &self,
        _function_name: &str,
    ) -> Result<BTreeMap<String, String>, ProviderError> {
        Self::refuse("GetFunctionConfiguration");
        Err(ProviderError::lambda(NOT_CONFIGURED))
    }

    async fn update_function_environment(
        &self,
        _function_name: &str,
        _revision: &CodeRevision,
        _variables: &BTreeMap<String, String>,
    ) -> Result<CodeRevision, ProviderError> {
        Self::refuse("UpdateFunctionConfiguration");
        Err(ProviderError::lambda(NOT_CONFIGURED))
    }

    async fn publish_version(
        &self,
        _function_name: &str,
        _revision: &CodeRevision,
        _description: &str,
    ) -> Result<String, ProviderError> {
        Self::refuse("PublishVersion");
        Err(ProviderError::lambda(NOT_CONFIGURED))
    }
}

#[async_trait]
impl EcsApi for Offline {
    async fn register_task_definition(
        &self,
        _registration: &TaskDefinitionRegistration,
    ) -> Result<String, ProviderError> {
        Self::refuse("RegisterTaskDefinition");
        Err(ProviderError::ecs(NOT_CONFIGURED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_refuses_calls() {
        let err = Offline.get_alias("orders-fn", "release").await.unwrap_err();
        assert_eq!(err, ProviderError::lambda(NOT_CONFIGURED));

        let err = Offline
            .register_task_definition(&TaskDefinitionRegistration::default())
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::ecs(NOT_CONFIGURED));
    }
}
