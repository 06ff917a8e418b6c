//! Core domain models and types for genbench
//!
//! This crate defines the domain language shared by every other genbench
//! crate: the endpoint catalog, the per-run record, the benchmark container
//! and the closed error taxonomy. It performs no process or filesystem work
//! beyond reading the catalog.

pub mod benchmark;
pub mod catalog;
pub mod error;
pub mod layout;
pub mod record;
pub mod types;

// Re-export commonly used types at the crate root
pub use benchmark::{BenchmarkManifest, BenchmarkRun, RunTally};
pub use catalog::{Catalog, EndpointDescriptor};
pub use error::{CatalogError, GenbenchError, InvalidEndpointError, ParseError, Result};
pub use record::{
    ArtifactCounts, CoverageFigures, ErrorCounts, ExitStatusRecord, ResourceMetricsRecord,
    ResourceSummary, RunKey, RunRecord,
};
pub use types::{Authorization, ErrorType, GenerationStatus, HttpMethod};

/// Upper bound, in characters, for stored free-text error messages
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// Placeholder written wherever a measured value is not available
pub const NOT_AVAILABLE: &str = "N/A";
