//! Generic reconciliation framework.
//!
//! This module provides the kind-agnostic half of a deployment: the
//! [`ResourceReconciler`] trait per-kind reconcilers implement, and the top-level
//! [`Reconciler`] that dispatches app spec entries to them by kind.
//!
//! # Main Components
//!
//! - [`ResourceReconciler`] - Trait a per-kind reconciler implements
//! - [`Reconciler`] - Registry of per-kind reconcilers and the reconciliation loop
//! - [`ReconcileError`] - Errors that abort a reconciliation
//!
//! # Testing
//!
//! See [`crate::clients::mock`] for provider mocks that make reconcilers testable
//! without AWS.

pub mod core;
pub mod error;

pub use core::*;
pub use error::*;
