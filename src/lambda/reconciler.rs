use crate::clients::LambdaApi;
use crate::framework::{
    ReconcileError, ReconcileOptions, ReconcileStep, ResourceReconciler,
};
use crate::model::{
    AppSpecResource, DeploySpecResource, FunctionAppSpec, FunctionDeploySpec, ResourceKind,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Version reported for both current and target version in a dry run.
pub const UNKNOWN_VERSION: &str = "UNKNOWN";

/// Alias looked up when the app spec entry does not name one.
pub const DEFAULT_ALIAS: &str = "release";

/// Reconciles `AWS::Lambda::Function` resources.
///
/// A live run reads the version the alias points at, uploads the new code, merges any
/// declared environment variables into the function configuration and publishes the
/// result as a new version:
///
/// ```text
/// GetAlias -> UpdateFunctionCode -> [GetFunctionConfiguration -> UpdateFunctionConfiguration] -> PublishVersion
/// ```
///
/// The alias itself is never moved.
#[derive(Clone)]
pub struct FunctionReconciler {
    client: Arc<dyn LambdaApi>,
}

impl FunctionReconciler {
    pub fn new(client: Arc<dyn LambdaApi>) -> Self {
        Self { client }
    }

    #[instrument(skip_all, fields(resource = name, dry_run = opts.dry_run))]
    pub async fn reconcile_function(
        &self,
        name: &str,
        target: &FunctionAppSpec,
        desired: &FunctionDeploySpec,
        opts: &ReconcileOptions,
    ) -> Result<FunctionAppSpec, ReconcileError> {
        if opts.dry_run {
            debug!("Dry run, skipping Lambda");
            return Ok(target.with_versions(UNKNOWN_VERSION, UNKNOWN_VERSION));
        }

        let function_name = target.properties.name.as_str();
        let alias = match target.properties.alias.as_str() {
            "" => DEFAULT_ALIAS,
            alias => alias,
        };

        let current_version = self
            .client
            .get_alias(function_name, alias)
            .await
            .map_err(ReconcileError::at_step(name, ReconcileStep::GetAlias))?;
        debug!(function_name, alias, %current_version, "Resolved alias");

        let mut revision = self
            .client
            .update_function_code(function_name, &desired.function_code)
            .await
            .map_err(ReconcileError::at_step(name, ReconcileStep::UpdateFunctionCode))?;
        debug!(revision_id = %revision.revision_id, "Uploaded code");

        if let Some(declared) = desired.environment().filter(|env| !env.is_empty()) {
            let existing = self
                .client
                .get_function_environment(function_name)
                .await
                .map_err(ReconcileError::at_step(name, ReconcileStep::GetFunctionConfiguration))?;
            let merged = merge_environment(existing, declared);
            revision = self
                .client
                .update_function_environment(function_name, &revision, &merged)
                .await
                .map_err(ReconcileError::at_step(
                    name,
                    ReconcileStep::UpdateFunctionConfiguration,
                ))?;
            debug!(variables = merged.len(), "Merged environment");
        }

        let target_version = self
            .client
            .publish_version(function_name, &revision, &desired.function_code.location())
            .await
            .map_err(ReconcileError::at_step(name, ReconcileStep::PublishVersion))?;
        info!(function_name, %current_version, %target_version, "Published version");

        Ok(target.with_versions(current_version, target_version))
    }
}

/// Declared variables override existing ones of the same name; the rest are kept.
pub fn merge_environment(
    mut existing: BTreeMap<String, String>,
    declared: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    existing.extend(declared.iter().map(|(k, v)| (k.clone(), v.clone())));
    existing
}

#[async_trait]
impl ResourceReconciler for FunctionReconciler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Function
    }

    async fn reconcile_resource(
        &self,
        name: &str,
        target: &AppSpecResource,
        desired: &DeploySpecResource,
        opts: &ReconcileOptions,
    ) -> Result<AppSpecResource, ReconcileError> {
        let (AppSpecResource::Function(target), DeploySpecResource::Function(desired)) =
            (target, desired)
        else {
            return Err(ReconcileError::KindMismatch {
                name: name.to_string(),
                expected: ResourceKind::Function,
                found: desired.tag().to_string(),
            });
        };
        Ok(self.reconcile_function(name, target, desired, opts).await?.into())
    }
}
