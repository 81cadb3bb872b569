//! Resource model error types.

use resdep_catalog::{CatalogError, HttpVerb};
use thiserror::Error;

/// Result type for resource model operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors raised by the resource model. All of them are caller bugs.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Unknown resource: {key}")]
    UnknownResource { key: String },

    #[error("Unknown template {template} for resource {resource}")]
    UnknownTemplate { resource: String, template: String },

    #[error("Resource {resource} has no {verb} action")]
    NoActionForVerb { resource: String, verb: HttpVerb },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ResourceError {
    pub fn unknown_resource(key: impl Into<String>) -> Self {
        Self::UnknownResource { key: key.into() }
    }

    pub fn unknown_template(resource: impl Into<String>, template: impl Into<String>) -> Self {
        Self::UnknownTemplate {
            resource: resource.into(),
            template: template.into(),
        }
    }

    pub fn no_action_for_verb(resource: impl Into<String>, verb: HttpVerb) -> Self {
        Self::NoActionForVerb {
            resource: resource.into(),
            verb,
        }
    }
}
