//! The `apply` operation: load a deploy spec, reconcile it, render the app spec.

use crate::clients::{AwsEcsClient, AwsLambdaClient, EcsApi, LambdaApi, Offline};
use crate::ecs::ServiceReconciler;
use crate::framework::{ReconcileError, ReconcileOptions, Reconciler};
use crate::lambda::FunctionReconciler;
use crate::runtime::{load_deploy_spec, render_app_spec, DocumentError};
use aws_config::{BehaviorVersion, Region};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Reconciliation failed")]
    Reconcile(#[from] ReconcileError),
}

/// A reconciler for every supported kind, calling the given providers.
pub fn default_reconciler(lambda: Arc<dyn LambdaApi>, ecs: Arc<dyn EcsApi>) -> Reconciler {
    Reconciler::new()
        .register(FunctionReconciler::new(lambda))
        .register(ServiceReconciler::new(ecs))
}

/// [`default_reconciler`] bound to AWS, configured from the environment. `region` and
/// `profile` override the ambient settings. Building it makes no network call.
pub async fn aws_reconciler(region: Option<String>, profile: Option<String>) -> Reconciler {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    let config = loader.load().await;

    default_reconciler(
        Arc::new(AwsLambdaClient::new(&config)),
        Arc::new(AwsEcsClient::new(&config)),
    )
}

/// [`default_reconciler`] for dry runs: loads no AWS configuration (no credential chain, no
/// instance metadata lookup) and fails any provider call instead of sending it.
pub fn dry_run_reconciler() -> Reconciler {
    default_reconciler(Arc::new(Offline), Arc::new(Offline))
}

/// Reconciles the deploy spec at `path` and returns the resulting app spec as YAML.
#[instrument(skip(reconciler))]
pub async fn apply(
    reconciler: &Reconciler,
    path: &Path,
    opts: &ReconcileOptions,
) -> Result<String, ApplyError> {
    let deploy_spec = load_deploy_spec(path).await?;
    let app_spec = reconciler.reconcile(&deploy_spec, opts).await?;
    info!(resources = app_spec.resources.len(), "Applied deploy spec");
    Ok(render_app_spec(&app_spec)?)
}
