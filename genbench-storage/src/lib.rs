//! Storage layer for genbench
//!
//! Run records live in the results tree itself: one directory per run,
//! holding the resource-metrics and exit-status halves of the record next to
//! the tool's own artifacts. [`RunRepository`] abstracts that store;
//! [`FilesystemRepository`] is the only implementation.
//!
//! The [`analysis`] and [`coverage`] modules read what the tool left behind
//! in a run directory, and [`MetricsRecorder`] ties them together at run end.

pub mod analysis;
pub mod coverage;
pub mod error;
pub mod recorder;
pub mod repository;

pub use analysis::{analyze_log, analyze_tests, LogAnalysis, TestSuiteAnalysis};
pub use coverage::read_coverage;
pub use error::{StorageError, StorageResult};
pub use recorder::{MetricsRecorder, RunAnalysis};
pub use repository::{
    write_atomic, write_json_atomic, FilesystemRepository, RunClaim, RunRepository, StoredRun,
};
