//! Reconciliation of `AWS::ECS::Service` resources.

pub mod reconciler;

pub use reconciler::*;
