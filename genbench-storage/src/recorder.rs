//! Metrics Recorder: turns a finished run directory into a durable record

use crate::analysis::{analyze_log, analyze_tests, LogAnalysis, TestSuiteAnalysis};
use crate::coverage::read_coverage;
use crate::error::StorageResult;
use crate::repository::{RunClaim, RunRepository};
use genbench_core::layout::{GENERATED_TESTS_DIR, TOOL_REPORT_DIR};
use genbench_core::{CoverageFigures, RunRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything read back from a run directory after the tool has exited
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunAnalysis {
    pub tests: TestSuiteAnalysis,
    pub log: LogAnalysis,
    pub coverage: CoverageFigures,
}

impl RunAnalysis {
    /// Analyse the artifacts in `run_dir` together with the run's log text
    pub fn of_run_dir(run_dir: &Path, log: &str) -> StorageResult<Self> {
        let tests = analyze_tests(&run_dir.join(GENERATED_TESTS_DIR))?;
        let coverage = read_coverage(&run_dir.join(TOOL_REPORT_DIR), log);
        debug!(
            tests_generated = tests.test_files,
            assertions = tests.assertions,
            coverage_available = coverage.is_available(),
            "Analysed {}",
            run_dir.display()
        );
        Ok(Self {
            tests,
            log: analyze_log(log),
            coverage,
        })
    }
}

/// Writes run records through a repository
pub struct MetricsRecorder<R: RunRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: RunRepository + ?Sized> MetricsRecorder<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Persist the resource-metrics and exit-status halves of `record`
    pub async fn record(&self, claim: &RunClaim, record: &RunRecord) -> StorageResult<PathBuf> {
        self.repository.save(claim, record).await
    }
}

impl<R: RunRepository + ?Sized> Clone for MetricsRecorder<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}
