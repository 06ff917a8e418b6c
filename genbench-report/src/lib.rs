//! Aggregation and reporting for genbench
//!
//! Everything in this crate is derived from run records already on disk and
//! can be regenerated at any time:
//!
//! - [`aggregate`] folds one endpoint's records into `run-averages.json`,
//! - [`analyze_endpoint`] merges its generated test suites into `test-analysis.json`,
//! - [`ResultsCollector`] reads a results tree through a run repository,
//! - [`ReportGenerator`] writes the benchmark-level CSV, JSON and markdown
//!   outputs and merges manual evaluation checklists.

pub mod aggregate;
pub mod collector;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod manual;
pub mod stats;
pub mod suite;
pub mod summary;

pub use aggregate::{aggregate, EndpointAggregate, ErrorSummary, ExitCodeSummary, RunSummary};
pub use collector::{CollectedResults, EndpointResults, ResultsCollector};
pub use dataset::{detailed_csv, result_row, results_csv, QUALITATIVE_COLUMNS, RESULT_COLUMNS};
pub use error::{ReportError, ReportResult};
pub use generator::{ReportGenerator, ReportOutputs};
pub use manual::{merge_manual_evaluations, ManualEvaluation};
pub use stats::Stats;
pub use suite::{analyze_endpoint, EndpointTestAnalysis};
pub use summary::{render_markdown, BenchmarkSummary};
