//! Error types for geoviz

use thiserror::Error;

use crate::geometry::GeometryKind;

/// Main error type for geoviz operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Visualizer is not initialized")]
    NotInitialized,

    #[error("Unsupported geometry kind: expected {expected:?}, found {found:?}")]
    UnsupportedGeometryKind {
        expected: Option<GeometryKind>,
        found: GeometryKind,
    },

    #[error("Shader {unit} failed to compile: {reason}")]
    Compile { unit: String, reason: String },

    #[error("Rendering failed in {failed:?}")]
    Render { failed: Vec<String> },

    #[error("Geometry is not tracked")]
    NotFound,
}

/// Result type alias for geoviz operations
pub type Result<T> = std::result::Result<T, Error>;
