//! Reporting over a finished results tree: regeneration, manual evaluations, CLI handlers

mod common;

use common::*;
use genbench_cli::commands::{handle_collect, handle_report, handle_run, load_config, RunOverrides};
use genbench_cli::{Completion, DriverOptions};
use genbench_config::GenbenchConfig;
use genbench_core::layout::{
    DETAILED_CSV_FILE, MANUAL_EVALUATION_FILE, METRICS_SUMMARY_FILE, RESULTS_CSV_FILE,
    RUN_AVERAGES_JSON, RUN_AVERAGES_TEXT, SUMMARY_REPORT_FILE, TEST_ANALYSIS_FILE,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CHECKLIST: &str = "\
# Manual Evaluation: Endpoint 7

### 1. Targets the correct endpoint
- [x] Yes
- [ ] No

### 2. Asserts the expected HTTP status
- [ ] Yes
- [x] Partial
- [ ] No

### 3. Uses the correct comparator
- [x] Yes

### 4. Inline with the endpoint scenarios
- [x] No

### 5. Missing URL parameter
- [x] Yes

### 6. Boundary conditions
- [ ] Yes
- [ ] No
";

/// Two recorded runs of endpoint 7 under `workdir/results`
async fn finished_benchmark(workdir: &Path) -> GenbenchConfig {
    let tool = write_tool(workdir, "evosuite.sh", SUCCESS_TOOL);
    let mut config = bench_config(workdir, &tool);
    config.benchmark.runs_per_endpoint = 2;

    let mut options = DriverOptions::from_config(&config);
    options.only_endpoint = Some(7);
    let benchmark = driver(config.clone()).run(&options).await.unwrap();
    assert_eq!(benchmark.records.len(), 2);
    config
}

fn report_files(root: &Path) -> Vec<PathBuf> {
    vec![
        root.join("endpoint_07").join(RUN_AVERAGES_JSON),
        root.join("endpoint_07").join(RUN_AVERAGES_TEXT),
        root.join("endpoint_07").join(TEST_ANALYSIS_FILE),
        root.join(METRICS_SUMMARY_FILE),
        root.join(RESULTS_CSV_FILE),
        root.join(DETAILED_CSV_FILE),
        root.join(SUMMARY_REPORT_FILE),
    ]
}

fn snapshot(files: &[PathBuf]) -> Vec<Vec<u8>> {
    files.iter().map(|f| std::fs::read(f).unwrap()).collect()
}

#[tokio::test]
async fn test_report_regeneration_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let config = finished_benchmark(temp.path()).await;
    let files = report_files(&config.benchmark.results_dir);
    let before = snapshot(&files);

    let completion = handle_report(&config, None, false).await.unwrap();
    assert_eq!(completion, Completion::Done);
    assert_eq!(snapshot(&files), before);

    // And once more through `collect`, which rewrites aggregates and the summary JSON
    handle_collect(&config, None).await.unwrap();
    assert_eq!(snapshot(&files), before);
}

#[tokio::test]
async fn test_manual_checklist_merges_into_table() {
    let temp = TempDir::new().unwrap();
    let config = finished_benchmark(temp.path()).await;
    let root = config.benchmark.results_dir.clone();

    std::fs::write(root.join("endpoint_07").join(MANUAL_EVALUATION_FILE), CHECKLIST).unwrap();
    handle_report(&config, Some(root.clone()), true).await.unwrap();

    let mut reader = csv::Reader::from_path(root.join(RESULTS_CSV_FILE)).unwrap();
    let headers = reader.headers().unwrap().clone();
    let at = |name: &str| headers.iter().position(|h| h == name).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(&row[at("targets_correct_endpoint")], "Yes");
        assert_eq!(&row[at("asserts_http_status")], "Partial");
        assert_eq!(&row[at("inline_with_scenarios")], "No");
        assert_eq!(&row[at("manual_evaluation_complete")], "TRUE");
        // Measured columns are left alone
        assert_eq!(&row[at("generation_status")], "SUCCESS");
        assert_eq!(&row[at("tests_generated")], "1");
    }
}

#[tokio::test]
async fn test_report_without_results_fails() {
    let temp = TempDir::new().unwrap();
    let config = GenbenchConfig::default();

    let err = handle_report(&config, Some(temp.path().join("absent")), false)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("absent"));
    assert!(handle_collect(&config, Some(temp.path().join("absent")))
        .await
        .is_err());
}

#[tokio::test]
async fn test_config_file_drives_run_command() {
    let temp = TempDir::new().unwrap();
    let tool = write_tool(temp.path(), "evosuite.sh", SUCCESS_TOOL);
    let results = temp.path().join("from-yaml");
    let yaml = format!(
        "\
benchmark:
  catalog_path: {catalog}
  results_dir: {results}
  runs_per_endpoint: 1
  search_budget_seconds: 5
  inter_run_pause: 0
  inter_endpoint_pause: 0
execution:
  tool:
    program: {tool}
    args: [\"{{tests_dir}}\", \"{{report_dir}}\", \"{{controller_class}}\"]
    cleanup: []
monitor:
  enabled: false
",
        catalog = catalog_path().display(),
        results = results.display(),
        tool = tool.display(),
    );
    let config_path = temp.path().join("genbench.yaml");
    std::fs::write(&config_path, yaml).unwrap();

    let config = load_config(Some(&config_path)).unwrap();
    assert_eq!(config.benchmark.results_dir, results);
    assert!(!config.monitor.enabled);

    let overrides = RunOverrides {
        endpoint: Some(7),
        ..RunOverrides::default()
    };
    let completion = handle_run(config, &overrides).await.unwrap();

    assert_eq!(completion, Completion::Done);
    assert_eq!(completion.exit_code(), 0);
    assert!(results.join("endpoint_07").join("run_01").is_dir());
    assert!(results.join(RESULTS_CSV_FILE).is_file());
}
