//! Names of files and directories in a results tree
//!
//! ```text
//! <results>/
//!   benchmark-run.json, benchmark-results.csv, detailed-metrics.csv,
//!   summary-report.md, metrics-summary.json
//!   endpoint_NN/
//!     run-averages.json, run-averages.txt, test-analysis.json,
//!     manual-evaluation.md
//!     run_NN/
//!       evosuite-output.log, resource-metrics.json, exit-status.json
//!       generated-tests/, evosuite-report/statistics.csv
//! ```

use crate::record::RunKey;
use std::path::{Path, PathBuf};

pub const RESOURCE_METRICS_FILE: &str = "resource-metrics.json";
pub const EXIT_STATUS_FILE: &str = "exit-status.json";
pub const GENERATED_TESTS_DIR: &str = "generated-tests";
pub const TOOL_REPORT_DIR: &str = "evosuite-report";
pub const TOOL_STATISTICS_FILE: &str = "statistics.csv";

pub const RUN_AVERAGES_JSON: &str = "run-averages.json";
pub const RUN_AVERAGES_TEXT: &str = "run-averages.txt";
pub const MANUAL_EVALUATION_FILE: &str = "manual-evaluation.md";
pub const TEST_ANALYSIS_FILE: &str = "test-analysis.json";

pub const BENCHMARK_MANIFEST_FILE: &str = "benchmark-run.json";
pub const RESULTS_CSV_FILE: &str = "benchmark-results.csv";
pub const DETAILED_CSV_FILE: &str = "detailed-metrics.csv";
pub const SUMMARY_REPORT_FILE: &str = "summary-report.md";
pub const METRICS_SUMMARY_FILE: &str = "metrics-summary.json";

pub fn endpoint_dir_name(endpoint_id: u32) -> String {
    format!("endpoint_{:02}", endpoint_id)
}

pub fn run_dir_name(run_number: u32) -> String {
    format!("run_{:02}", run_number)
}

pub fn endpoint_dir(results_root: &Path, endpoint_id: u32) -> PathBuf {
    results_root.join(endpoint_dir_name(endpoint_id))
}

pub fn run_dir(results_root: &Path, key: RunKey) -> PathBuf {
    endpoint_dir(results_root, key.endpoint_id).join(run_dir_name(key.run_number))
}

/// Parse the numeric suffix of `endpoint_NN` / `run_NN` directory names
pub fn parse_numbered_dir(name: &str, prefix: &str) -> Option<u32> {
    name.strip_prefix(prefix)?
        .strip_prefix('_')?
        .parse()
        .ok()
        .filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dir_layout() {
        let dir = run_dir(Path::new("results"), RunKey::new(7, 2));
        assert_eq!(dir, PathBuf::from("results/endpoint_07/run_02"));
        assert_eq!(
            endpoint_dir(Path::new("results"), 13),
            PathBuf::from("results/endpoint_13")
        );
    }

    #[test]
    fn test_parse_numbered_dir() {
        assert_eq!(parse_numbered_dir("endpoint_07", "endpoint"), Some(7));
        assert_eq!(parse_numbered_dir("run_12", "run"), Some(12));
        assert_eq!(parse_numbered_dir("run_00", "run"), None);
        assert_eq!(parse_numbered_dir("run-1", "run"), None);
        assert_eq!(parse_numbered_dir("endpoint_x", "endpoint"), None);
    }

    #[test]
    fn test_names_parse_back() {
        assert_eq!(endpoint_dir_name(7), "endpoint_07");
        assert_eq!(endpoint_dir_name(112), "endpoint_112");
        assert_eq!(run_dir_name(3), "run_03");
        assert_eq!(parse_numbered_dir(&endpoint_dir_name(12), "endpoint"), Some(12));
        assert_eq!(parse_numbered_dir(&run_dir_name(112), "run"), Some(112));
    }
}
