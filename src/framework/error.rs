//! # Reconciliation Errors
//!
//! Every failure aborts the whole reconciliation. Errors name the resource and, for
//! provider failures, the step that failed, so a partially applied deployment can be
//! diagnosed from the message alone.

use crate::clients::ProviderError;
use crate::model::ResourceKind;
use std::fmt;
use thiserror::Error;

/// The provider call a resource was at when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStep {
    GetAlias,
    UpdateFunctionCode,
    GetFunctionConfiguration,
    UpdateFunctionConfiguration,
    PublishVersion,
    RegisterTaskDefinition,
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileStep::GetAlias => "GetAlias",
            ReconcileStep::UpdateFunctionCode => "UpdateFunctionCode",
            ReconcileStep::GetFunctionConfiguration => "GetFunctionConfiguration",
            ReconcileStep::UpdateFunctionConfiguration => "UpdateFunctionConfiguration",
            ReconcileStep::PublishVersion => "PublishVersion",
            ReconcileStep::RegisterTaskDefinition => "RegisterTaskDefinition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReconcileError {
    /// An app spec entry names a resource the deploy spec does not declare.
    #[error("Resource `{name}` has no matching entry in the deploy spec")]
    MissingDeploySpec { name: String },

    /// The app spec and the deploy spec disagree on a resource's kind.
    #[error("Resource `{name}` is {expected} in the app spec but `{found}` in the deploy spec")]
    KindMismatch {
        name: String,
        expected: ResourceKind,
        found: String,
    },

    /// A provider call failed.
    #[error("Resource `{name}`: {step} failed")]
    Provider {
        name: String,
        step: ReconcileStep,
        #[source]
        source: ProviderError,
    },
}

impl ReconcileError {
    /// Adapter for `map_err` that tags a provider error with its resource and step.
    pub fn at_step(name: &str, step: ReconcileStep) -> impl FnOnce(ProviderError) -> Self + '_ {
        move |source| ReconcileError::Provider {
            name: name.to_string(),
            step,
            source,
        }
    }
}
