//! Error types for provider clients.

use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// The underlying cause of a failed provider call: an SDK error, a request that could not be
/// built, or a message from this crate's own checks.
pub type ProviderSource = Arc<dyn StdError + Send + Sync>;

/// Errors returned by a provider control-plane call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The Lambda API rejected or failed the request.
    #[error("Lambda API call failed")]
    Lambda(#[source] ProviderSource),

    /// The ECS API rejected or failed the request.
    #[error("ECS API call failed")]
    Ecs(#[source] ProviderSource),

    /// The call succeeded but the response lacked a field the reconciler depends on.
    #[error("{operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

impl ProviderError {
    /// A Lambda failure described by `message` alone.
    pub fn lambda(message: impl Into<String>) -> Self {
        ProviderError::Lambda(message_source(message))
    }

    /// An ECS failure described by `message` alone.
    pub fn ecs(message: impl Into<String>) -> Self {
        ProviderError::Ecs(message_source(message))
    }
}

fn message_source(message: impl Into<String>) -> ProviderSource {
    let boxed: Box<dyn StdError + Send + Sync> = message.into().into();
    Arc::from(boxed)
}

/// Errors compare by variant and rendered cause, so tests can assert on them.
impl PartialEq for ProviderError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ProviderError::Lambda(a), ProviderError::Lambda(b))
            | (ProviderError::Ecs(a), ProviderError::Ecs(b)) => a.to_string() == b.to_string(),
            (
                ProviderError::MissingField { operation, field },
                ProviderError::MissingField {
                    operation: other_operation,
                    field: other_field,
                },
            ) => operation == other_operation && field == other_field,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_is_kept_as_source() {
        let err = ProviderError::lambda("ResourceNotFoundException: Function not found");

        assert_eq!(err.to_string(), "Lambda API call failed");
        assert_eq!(
            err.source().map(|source| source.to_string()),
            Some("ResourceNotFoundException: Function not found".to_string())
        );
    }

    #[test]
    fn test_errors_compare_by_cause() {
        assert_eq!(ProviderError::ecs("ClientException"), ProviderError::ecs("ClientException"));
        assert_ne!(ProviderError::ecs("ClientException"), ProviderError::lambda("ClientException"));
    }
}
