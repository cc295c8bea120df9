//! Reconciliation of `AWS::Lambda::Function` resources.

pub mod reconciler;

pub use reconciler::*;
