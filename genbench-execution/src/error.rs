//! Execution error types

use crate::shutdown::ShutdownSignal;
use thiserror::Error;

/// Result type for execution operations
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Failures of the harness itself. A tool that fails is not an error here;
/// it yields a normal [`RawExecution`](crate::RawExecution).
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run log could not be written: {0}")]
    LogWriter(String),

    #[error("Required binary not found on PATH: {0}")]
    MissingDependency(String),

    #[error("Run cancelled by {0}")]
    Cancelled(ShutdownSignal),
}

impl ExecutionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled(_))
    }
}
