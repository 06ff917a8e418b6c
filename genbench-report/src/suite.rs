//! Per-endpoint view of the generated test suites: `test-analysis.json`

use crate::collector::EndpointResults;
use crate::error::ReportResult;
use genbench_core::layout::{run_dir_name, GENERATED_TESTS_DIR};
use genbench_storage::{analyze_tests, TestSuiteAnalysis};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointTestAnalysis {
    pub endpoint_id: u32,
    pub runs_analysed: usize,
    /// Every recorded run's generated tests, merged
    pub suite: TestSuiteAnalysis,
    /// Observations keyed by the checklist column they help answer
    pub hints: BTreeMap<String, String>,
}

/// Re-scan the generated tests of every recorded run of one endpoint
pub fn analyze_endpoint(endpoint: &EndpointResults) -> ReportResult<EndpointTestAnalysis> {
    let mut suite = TestSuiteAnalysis::default();
    for record in &endpoint.records {
        let tests_dir = endpoint
            .dir
            .join(run_dir_name(record.run_number))
            .join(GENERATED_TESTS_DIR);
        suite.merge(&analyze_tests(&tests_dir)?);
    }

    let hints = suite
        .evaluation_hints()
        .into_iter()
        .map(|(column, hint)| (column.to_string(), hint))
        .collect();

    Ok(EndpointTestAnalysis {
        endpoint_id: endpoint.endpoint_id,
        runs_analysed: endpoint.records.len(),
        suite,
        hints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    const SUITE: &str = "\
public class ContactsController_ESTest {
  @Test(timeout = 4000)
  public void test0() throws Throwable {
    assertEquals(404, response.getStatusCodeValue());
    assertNull(body);
  }
}
";

    fn write_suite(endpoint_dir: &Path, run: u32) {
        let dir = endpoint_dir
            .join(run_dir_name(run))
            .join(GENERATED_TESTS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ContactsController_ESTest.java"), SUITE).unwrap();
    }

    fn endpoint(dir: &Path, runs: &[u32]) -> EndpointResults {
        use chrono::{TimeZone, Utc};
        use genbench_core::{
            ArtifactCounts, CoverageFigures, ErrorCounts, ErrorType, GenerationStatus,
            ResourceSummary, RunRecord,
        };

        let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let records = runs
            .iter()
            .map(|&run_number| RunRecord {
                endpoint_id: 7,
                run_number,
                started_at: at,
                finished_at: at,
                duration_seconds: 60.0,
                search_budget_seconds: 60,
                exit_code: 0,
                timed_out: false,
                generation_status: GenerationStatus::Success,
                error_type: ErrorType::None,
                error_message: String::new(),
                error_counts: ErrorCounts::default(),
                resources: ResourceSummary::default(),
                artifacts: ArtifactCounts::default(),
                coverage: CoverageFigures::unavailable(),
            })
            .collect();

        EndpointResults {
            endpoint_id: 7,
            dir: dir.to_path_buf(),
            expected_runs: Some(runs.len() as u32),
            records,
            unrecorded: Vec::new(),
        }
    }

    #[test]
    fn test_suites_merged_across_runs() {
        let temp = TempDir::new().unwrap();
        write_suite(temp.path(), 1);
        write_suite(temp.path(), 2);

        let analysis = analyze_endpoint(&endpoint(temp.path(), &[1, 2, 3])).unwrap();

        assert_eq!(analysis.runs_analysed, 3);
        assert_eq!(analysis.suite.test_files, 2);
        assert_eq!(analysis.suite.test_methods, 2);
        assert_eq!(analysis.suite.assertion_types.get("assertEquals"), Some(&2));
        assert_eq!(analysis.suite.test_classes, vec!["ContactsController_ESTest"]);
        assert_eq!(
            analysis.hints.get("asserts_http_status").map(String::as_str),
            Some("2 HTTP status assertions found")
        );
    }

    #[test]
    fn test_no_generated_tests() {
        let temp = TempDir::new().unwrap();
        let analysis = analyze_endpoint(&endpoint(temp.path(), &[1])).unwrap();

        assert_eq!(analysis.suite.test_files, 0);
        assert_eq!(
            analysis.hints.get("tests").map(String::as_str),
            Some("No generated test files found")
        );
    }
}
