//! Dependency inference error types.

use crate::mutation::MutationKind;
use resdep_resource::ResourceError;
use thiserror::Error;

/// Result type for dependency operations.
pub type DependencyResult<T> = Result<T, DependencyError>;

/// Errors raised by dependency inference. All of them are caller bugs.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("Undefined structure mutation: size changed from {previous} to {current} calls")]
    UndefinedMutation { previous: usize, current: usize },

    #[error("{kind:?} changed {positions} positions")]
    AmbiguousEdit { kind: MutationKind, positions: usize },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl DependencyError {
    pub fn undefined_mutation(previous: usize, current: usize) -> Self {
        Self::UndefinedMutation { previous, current }
    }

    pub fn ambiguous_edit(kind: MutationKind, positions: usize) -> Self {
        Self::AmbiguousEdit { kind, positions }
    }
}
