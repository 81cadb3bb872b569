//! Engine error types.

use resdep_catalog::CatalogError;
use resdep_dependency::DependencyError;
use resdep_resource::ResourceError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Position {position} out of range for {len} calls")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("Resource manager used before init_resources")]
    NotInitialized,

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn position_out_of_range(position: usize, len: usize) -> Self {
        Self::PositionOutOfRange { position, len }
    }
}
