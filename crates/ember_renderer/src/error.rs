//! Error types for scene construction and rendering.
//!
//! Only construction problems are errors. A degenerate ray or a NaN sample
//! during rendering is recovered locally (treated as a miss or a zero sample)
//! and never surfaces here.

use thiserror::Error;

/// Scene setup failed; no partial acceleration structure is produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("scene has no primitives")]
    EmptyScene,

    #[error("primitive {index} has non-finite bounds")]
    NonFiniteBounds { index: usize },

    #[error("invalid primitive: {reason}")]
    InvalidPrimitive { reason: String },
}

impl SceneError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SceneError::InvalidPrimitive {
            reason: reason.into(),
        }
    }
}

/// Rendering could not start.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("scene acceleration structure is missing or stale; call Scene::initialize_bvh first")]
    SceneNotInitialized,

    #[error("invalid render configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Scene(#[from] SceneError),
}
