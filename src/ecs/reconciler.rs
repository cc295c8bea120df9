use crate::clients::EcsApi;
use crate::framework::{
    ReconcileError, ReconcileOptions, ReconcileStep, ResourceReconciler,
};
use crate::model::{
    AppSpecResource, DeploySpecResource, ResourceKind, ServiceAppSpec, ServiceDeploySpec,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Task definition reported in a dry run.
pub const PLACEHOLDER_TASK_DEFINITION: &str = "<DRY RUN PLACEHOLDER>";

/// Reconciles `AWS::ECS::Service` resources by registering a new task definition
/// revision and pointing the app spec entry at it. The service is not updated.
#[derive(Clone)]
pub struct ServiceReconciler {
    client: Arc<dyn EcsApi>,
}

impl ServiceReconciler {
    pub fn new(client: Arc<dyn EcsApi>) -> Self {
        Self { client }
    }

    #[instrument(skip_all, fields(resource = name, dry_run = opts.dry_run))]
    pub async fn reconcile_service(
        &self,
        name: &str,
        target: &ServiceAppSpec,
        desired: &ServiceDeploySpec,
        opts: &ReconcileOptions,
    ) -> Result<ServiceAppSpec, ReconcileError> {
        if opts.dry_run {
            debug!("Dry run, skipping ECS");
            return Ok(target.with_task_definition(PLACEHOLDER_TASK_DEFINITION));
        }

        let registration = &desired.register_task_definition_input;
        let task_definition = self
            .client
            .register_task_definition(registration)
            .await
            .map_err(ReconcileError::at_step(name, ReconcileStep::RegisterTaskDefinition))?;
        info!(family = %registration.family, %task_definition, "Registered task definition");

        Ok(target.with_task_definition(task_definition))
    }
}

#[async_trait]
impl ResourceReconciler for ServiceReconciler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    async fn reconcile_resource(
        &self,
        name: &str,
        target: &AppSpecResource,
        desired: &DeploySpecResource,
        opts: &ReconcileOptions,
    ) -> Result<AppSpecResource, ReconcileError> {
        let (AppSpecResource::Service(target), DeploySpecResource::Service(desired)) =
            (target, desired)
        else {
            return Err(ReconcileError::KindMismatch {
                name: name.to_string(),
                expected: ResourceKind::Service,
                found: desired.tag().to_string(),
            });
        };
        Ok(self.reconcile_service(name, target, desired, opts).await?.into())
    }
}
