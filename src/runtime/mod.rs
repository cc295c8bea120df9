//! Runtime wiring around the reconciliation engine.
//!
//! This module contains everything between the command line and the [`Reconciler`]:
//!
//! - **Document I/O**: Loading deploy specs and rendering app specs as YAML
//! - **Provider wiring**: Building a [`Reconciler`] bound to AWS or to injected clients
//! - **Observability setup**: Initializing tracing and logging
//!
//! # Main Components
//!
//! - [`apply`] - Loads, reconciles and renders in one call
//! - [`aws_reconciler`] / [`dry_run_reconciler`] / [`default_reconciler`] - Reconciler construction
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure
//!
//! [`Reconciler`]: crate::framework::Reconciler

pub mod apply;
pub mod document;
pub mod tracing;

pub use apply::*;
pub use document::*;
pub use tracing::*;
