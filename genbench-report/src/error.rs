//! Report error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type for report operations
pub type ReportResult<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Results directory not found: {}", .0.display())]
    MissingResults(PathBuf),

    #[error("Results table not found: {} (generate reports before merging)", .0.display())]
    MissingTable(PathBuf),

    #[error("Results table {} has no '{column}' column", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Storage error: {0}")]
    Storage(#[from] genbench_storage::StorageError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for ReportError {
    fn from(err: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        ReportError::Io(err.into_error())
    }
}
