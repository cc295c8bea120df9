//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate. Logs go to
//! stderr: stdout is reserved for the rendered app spec so it can be piped elsewhere.
//!
//! ## Usage Examples
//!
//! ```bash
//! # One line per reconciled resource
//! RUST_LOG=info deployspec apply --file deployspec.yaml
//!
//! # Every provider call, with its arguments
//! RUST_LOG=debug deployspec apply --file deployspec.yaml
//!
//! # Only this crate, without AWS SDK noise
//! RUST_LOG=deployspec=debug deployspec apply --file deployspec.yaml
//! ```
//!
//! ## Workflow Trace Example
//!
//! **With `RUST_LOG=info`** (compact):
//!
//! ```text
//! INFO reconcile:reconcile_function: Published version function_name="orders-fn" current_version=3 target_version=4
//! INFO reconcile: Reconciled resource="Orders" kind=AWS::Lambda::Function
//! INFO reconcile:reconcile_service: Registered task definition family=web task_definition=arn:aws:ecs:...:task-definition/web:7
//! INFO reconcile: Reconciled resource="Web" kind=AWS::ECS::Service
//! INFO reconcile: Reconciliation complete resources=2
//! ```
//!
//! Spans carry `resource` and `dry_run`, so every provider call can be traced back to the
//! resource it was made for.

/// Installs the global subscriber. Filtering follows `RUST_LOG`; nothing is logged when
/// it is unset.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
