//! Core error types for genbench

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for orchestration-level failures
#[derive(Debug, Error)]
pub enum GenbenchError {
    /// Endpoint catalog errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Value parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Required external dependency is absent
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for genbench
pub type Result<T> = std::result::Result<T, GenbenchError>;

impl From<serde_json::Error> for GenbenchError {
    fn from(err: serde_json::Error) -> Self {
        GenbenchError::Serialization(err.to_string())
    }
}

/// Endpoint catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read catalog: {0}")]
    Read(#[from] csv::Error),

    #[error("Malformed catalog row at line {line}: {message}")]
    Malformed { line: u64, message: String },

    #[error("Duplicate endpoint id {id} at line {line}")]
    DuplicateId { id: u32, line: u64 },

    #[error("Endpoint ids must be dense starting at 1: expected {expected}, found {found}")]
    NonDenseIds { expected: u32, found: u32 },

    #[error("Catalog contains no endpoints")]
    Empty,

    #[error(transparent)]
    NotFound(#[from] InvalidEndpointError),
}

/// Requested endpoint id is outside the loaded catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid endpoint id {id}: catalog defines endpoints 1..={max}")]
pub struct InvalidEndpointError {
    pub id: u32,
    pub max: u32,
}

/// Errors from parsing enum values out of text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid HTTP method: '{0}'. Supported methods are: GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS")]
    InvalidHttpMethod(String),

    #[error("Invalid authorization requirement: '{0}'. Supported values are: none, user, admin")]
    InvalidAuthorization(String),

    #[error("Invalid error type: '{0}'")]
    InvalidErrorType(String),

    #[error("Invalid generation status: '{0}'. Supported values are: SUCCESS, FAILED")]
    InvalidGenerationStatus(String),
}
