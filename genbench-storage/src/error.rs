//! Storage error types

use genbench_core::RunKey;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another writer holds the run directory
    #[error("Run directory for {0} is already claimed by another writer")]
    AlreadyClaimed(RunKey),

    /// Write attempted with a claim for a different run
    #[error("Claim for {claimed} cannot write the record of {record}")]
    ClaimMismatch { claimed: RunKey, record: RunKey },

    /// Only one half of a record is on disk
    #[error("Incomplete record for {key}: {} is missing", .missing.display())]
    Incomplete { key: RunKey, missing: PathBuf },

    /// A record file exists but cannot be parsed
    #[error("Corrupt record file {}: {message}", .path.display())]
    Corrupt { path: PathBuf, message: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record halves disagree
    #[error(transparent)]
    Record(#[from] genbench_core::GenbenchError),
}
