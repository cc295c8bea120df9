//! # Core Reconciliation Framework
//!
//! This module defines the generic building blocks of a reconciliation.
//!
//! ## Key Types
//!
//! - [`ResourceReconciler`]: The trait every per-kind reconciler implements.
//! - [`Reconciler`]: The top-level reconciler. Holds one [`ResourceReconciler`] per kind
//!   and walks the app spec skeleton.
//! - [`ReconcileOptions`]: Per-run switches (dry run).

use crate::framework::ReconcileError;
use crate::model::{
    AppSpec, AppSpecResource, DeploySpec, DeploySpecResource, ResourceKind, ResourceList,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Skip every provider call and fill unknown fields with placeholders.
    pub dry_run: bool,
}

impl ReconcileOptions {
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that a per-kind reconciler implements to be dispatched by [`Reconciler`].
///
/// # Architecture Note
/// The top-level loop only knows envelopes. Each implementation owns the provider-call
/// protocol for one [`ResourceKind`], so supporting a new kind means registering a new
/// implementation rather than editing the loop.
///
/// Implementations must not call a provider when `opts.dry_run` is set, and must return
/// a resource of the same shape either way.
#[async_trait]
pub trait ResourceReconciler: Send + Sync {
    /// The kind this reconciler handles.
    fn kind(&self) -> ResourceKind;

    /// Reconcile one named resource: `target` is the app spec skeleton entry, `desired`
    /// the deploy spec entry with the same name. Both are of [`Self::kind`].
    async fn reconcile_resource(
        &self,
        name: &str,
        target: &AppSpecResource,
        desired: &DeploySpecResource,
        opts: &ReconcileOptions,
    ) -> Result<AppSpecResource, ReconcileError>;
}

// =============================================================================
// 2. THE TOP-LEVEL RECONCILER
// =============================================================================

/// Reconciles a whole deploy spec, one resource at a time, in app spec order.
#[derive(Clone, Default)]
pub struct Reconciler {
    reconcilers: HashMap<ResourceKind, Arc<dyn ResourceReconciler>>,
}

impl Reconciler {
    /// Creates a reconciler with no kinds registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reconciler` for its kind, replacing any earlier registration.
    pub fn register(mut self, reconciler: impl ResourceReconciler + 'static) -> Self {
        self.reconcilers.insert(reconciler.kind(), Arc::new(reconciler));
        self
    }

    /// Kinds with a registered reconciler, in a stable order.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<_> = self.reconcilers.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Reconciles every app spec resource of `deploy_spec` against its deploy spec entry.
    ///
    /// The result keeps the app spec's version and resource order. Resources of an
    /// unrecognised kind are left out. The first failure aborts the run and no document
    /// is returned; provider changes already made for earlier resources stay in place.
    #[instrument(skip_all, fields(version = %deploy_spec.app_spec.version, dry_run = opts.dry_run))]
    pub async fn reconcile(
        &self,
        deploy_spec: &DeploySpec,
        opts: &ReconcileOptions,
    ) -> Result<AppSpec, ReconcileError> {
        let desired_by_name = index_by_name(&deploy_spec.resources);
        let mut result = AppSpec::new(deploy_spec.app_spec.version.clone());

        for entry in &deploy_spec.app_spec.resources {
            let name = entry.name.as_str();
            let Some(kind) = entry.resource.kind() else {
                debug!(resource = name, tag = entry.resource.tag(), "Skipping unknown kind");
                continue;
            };
            let Some(reconciler) = self.reconcilers.get(&kind) else {
                warn!(resource = name, %kind, "No reconciler registered, skipping");
                continue;
            };

            let desired = desired_by_name
                .get(name)
                .copied()
                .ok_or_else(|| ReconcileError::MissingDeploySpec {
                    name: name.to_string(),
                })?;
            if desired.kind() != Some(kind) {
                return Err(ReconcileError::KindMismatch {
                    name: name.to_string(),
                    expected: kind,
                    found: desired.tag().to_string(),
                });
            }

            debug!(resource = name, %kind, "Reconciling");
            let reconciled = reconciler
                .reconcile_resource(name, &entry.resource, desired, opts)
                .await
                .inspect_err(|e| warn!(resource = name, error = %e, "Reconcile failed"))?;
            info!(resource = name, %kind, "Reconciled");
            result.resources.push(name, reconciled);
        }

        info!(resources = result.resources.len(), "Reconciliation complete");
        Ok(result)
    }
}

/// Deploy spec resources by name. A later declaration of a name replaces an earlier one.
fn index_by_name(resources: &ResourceList<DeploySpecResource>) -> HashMap<&str, &DeploySpecResource> {
    let mut by_name = HashMap::with_capacity(resources.len());
    for entry in resources {
        if by_name.insert(entry.name.as_str(), &entry.resource).is_some() {
            warn!(resource = %entry.name, "Duplicate deploy spec resource, the last one wins");
        }
    }
    by_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FunctionAppSpec, FunctionCode, FunctionDeploySpec};
    use std::sync::Mutex;

    /// Records what it was asked to reconcile and stamps the result with the desired S3 key.
    #[derive(Clone, Default)]
    struct RecordingReconciler {
        seen: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl ResourceReconciler for RecordingReconciler {
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
            self.seen.lock().unwrap().push(name.to_string());
            if self.fail_on == Some(name) {
                return Err(ReconcileError::MissingDeploySpec {
                    name: format!("{name}-forced"),
                });
            }
            let (AppSpecResource::Function(target), DeploySpecResource::Function(desired)) =
                (target, desired)
            else {
                panic!("Dispatched a non-function resource");
            };
            let version = if opts.dry_run { "dry" } else { desired.function_code.s3_key.as_str() };
            Ok(target.with_versions("0", version).into())
        }
    }

    fn function(key: &str) -> FunctionDeploySpec {
        FunctionDeploySpec::new(FunctionCode::new("bucket", key))
    }

    fn skeleton(names: &[&str]) -> AppSpec {
        names.iter().fold(AppSpec::new("1.0"), |spec, name| {
            spec.with_resource(*name, FunctionAppSpec::new(*name, "release"))
        })
    }

    fn target_versions(result: &AppSpec) -> Vec<(&str, &str)> {
        result
            .resources
            .iter()
            .map(|entry| {
                let function = entry.resource.as_function().unwrap();
                (entry.name.as_str(), function.properties.target_version.as_str())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_result_follows_app_spec_order() {
        let spec = DeploySpec::new("1.0", skeleton(&["b", "a", "c"]))
            .with_resource("a", function("key-a"))
            .with_resource("c", function("key-c"))
            .with_resource("b", function("key-b"));
        let recorder = RecordingReconciler::default();
        let reconciler = Reconciler::new().register(recorder.clone());

        let result = reconciler.reconcile(&spec, &ReconcileOptions::default()).await.unwrap();

        assert_eq!(result.version, "1.0");
        assert_eq!(
            target_versions(&result),
            vec![("b", "key-b"), ("a", "key-a"), ("c", "key-c")]
        );
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_options_reach_the_kind_reconciler() {
        let spec = DeploySpec::new("1.0", skeleton(&["a"])).with_resource("a", function("key-a"));
        let reconciler = Reconciler::new().register(RecordingReconciler::default());

        let result = reconciler.reconcile(&spec, &ReconcileOptions::dry_run()).await.unwrap();
        assert_eq!(target_versions(&result), vec![("a", "dry")]);
    }

    #[tokio::test]
    async fn test_unknown_kinds_are_skipped() {
        let mut app_spec = skeleton(&["a"]);
        app_spec.resources.push("bucket", AppSpecResource::Unknown("AWS::S3::Bucket".into()));
        app_spec.resources.push("b", FunctionAppSpec::new("b", "release"));
        let spec = DeploySpec::new("1.0", app_spec)
            .with_resource("a", function("key-a"))
            .with_resource("b", function("key-b"));
        let reconciler = Reconciler::new().register(RecordingReconciler::default());

        let result = reconciler.reconcile(&spec, &ReconcileOptions::default()).await.unwrap();
        assert_eq!(target_versions(&result), vec![("a", "key-a"), ("b", "key-b")]);
    }

    #[tokio::test]
    async fn test_kinds_without_a_registered_reconciler_are_skipped() {
        let spec = DeploySpec::new("1.0", skeleton(&["a"])).with_resource("a", function("key-a"));

        let result = Reconciler::new().reconcile(&spec, &ReconcileOptions::default()).await.unwrap();
        assert!(result.resources.is_empty());
        assert!(Reconciler::new().kinds().is_empty());
    }

    #[tokio::test]
    async fn test_missing_deploy_spec_entry_fails_before_dispatch() {
        let spec = DeploySpec::new("1.0", skeleton(&["a", "ghost"]))
            .with_resource("a", function("key-a"));
        let recorder = RecordingReconciler::default();
        let reconciler = Reconciler::new().register(recorder.clone());

        let err = reconciler.reconcile(&spec, &ReconcileOptions::default()).await.unwrap_err();
        assert_eq!(err, ReconcileError::MissingDeploySpec { name: "ghost".to_string() });
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_rejected() {
        let spec = DeploySpec::new("1.0", skeleton(&["a"]))
            .with_resource("a", DeploySpecResource::Unknown("Custom::Thing".into()));
        let reconciler = Reconciler::new().register(RecordingReconciler::default());

        let err = reconciler.reconcile(&spec, &ReconcileOptions::default()).await.unwrap_err();
        assert_eq!(
            err,
            ReconcileError::KindMismatch {
                name: "a".to_string(),
                expected: ResourceKind::Function,
                found: "Custom::Thing".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_run() {
        let spec = DeploySpec::new("1.0", skeleton(&["a", "b", "c"]))
            .with_resource("a", function("key-a"))
            .with_resource("b", function("key-b"))
            .with_resource("c", function("key-c"));
        let recorder = RecordingReconciler {
            fail_on: Some("b"),
            ..RecordingReconciler::default()
        };
        let reconciler = Reconciler::new().register(recorder.clone());

        assert!(reconciler.reconcile(&spec, &ReconcileOptions::default()).await.is_err());
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_duplicate_deploy_spec_names_last_one_wins() {
        let spec = DeploySpec::new("1.0", skeleton(&["a"]))
            .with_resource("a", function("first"))
            .with_resource("a", function("second"));
        let reconciler = Reconciler::new().register(RecordingReconciler::default());

        let result = reconciler.reconcile(&spec, &ReconcileOptions::default()).await.unwrap();
        assert_eq!(target_versions(&result), vec![("a", "second")]);
    }

    #[test]
    fn test_register_replaces_earlier_registration() {
        let reconciler = Reconciler::new()
            .register(RecordingReconciler::default())
            .register(RecordingReconciler::default());
        assert_eq!(reconciler.kinds(), vec![ResourceKind::Function]);
    }
}
