//! Catalogue error types.

use thiserror::Error;

/// Result type for catalogue operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while loading or interpreting an action catalogue.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid path template {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Unknown HTTP verb: {verb}")]
    UnknownVerb { verb: String },

    #[error("Duplicate action: {name}")]
    DuplicateAction { name: String },

    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    #[error("Pattern error: {message}")]
    Pattern { message: String },

    #[error("Malformed catalogue JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_verb(verb: impl Into<String>) -> Self {
        Self::UnknownVerb { verb: verb.into() }
    }

    pub fn duplicate_action(name: impl Into<String>) -> Self {
        Self::DuplicateAction { name: name.into() }
    }

    pub fn unknown_table(name: impl Into<String>) -> Self {
        Self::UnknownTable { name: name.into() }
    }

    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
        }
    }
}
