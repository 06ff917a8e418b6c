//! Report Generator: writes every derived output of a results tree

use crate::aggregate::{aggregate, EndpointAggregate};
use crate::collector::CollectedResults;
use crate::dataset::{detailed_csv, results_csv};
use crate::error::ReportResult;
use crate::manual::merge_manual_evaluations;
use crate::suite::analyze_endpoint;
use crate::summary::{render_markdown, BenchmarkSummary};
use genbench_config::ReportConfig;
use genbench_core::layout::{
    DETAILED_CSV_FILE, METRICS_SUMMARY_FILE, RESULTS_CSV_FILE, RUN_AVERAGES_JSON,
    RUN_AVERAGES_TEXT, SUMMARY_REPORT_FILE, TEST_ANALYSIS_FILE,
};
use genbench_core::Catalog;
use genbench_storage::{write_atomic, write_json_atomic};
use std::path::{Path, PathBuf};
use tracing::info;

/// Paths written by [`ReportGenerator::generate`]
#[derive(Debug, Clone, Default)]
pub struct ReportOutputs {
    pub endpoint_aggregates: Vec<PathBuf>,
    pub metrics_summary: PathBuf,
    pub results_csv: PathBuf,
    pub detailed_csv: Option<PathBuf>,
    pub summary_report: PathBuf,
}

pub struct ReportGenerator {
    config: ReportConfig,
    catalog: Option<Catalog>,
}

impl ReportGenerator {
    /// Without a catalog, endpoint identification columns read `N/A`
    pub fn new(config: ReportConfig, catalog: Option<Catalog>) -> Self {
        Self { config, catalog }
    }

    /// Aggregate each endpoint and write its `run-averages.json` / `.txt` and `test-analysis.json`
    pub async fn aggregate_endpoints(
        &self,
        collected: &CollectedResults,
    ) -> ReportResult<(Vec<EndpointAggregate>, Vec<PathBuf>)> {
        let mut aggregates = Vec::with_capacity(collected.endpoints.len());
        let mut written = Vec::new();

        for endpoint in &collected.endpoints {
            let result = aggregate(endpoint.endpoint_id, endpoint.expected_runs, &endpoint.records);
            tokio::fs::create_dir_all(&endpoint.dir).await?;

            let json_path = endpoint.dir.join(RUN_AVERAGES_JSON);
            write_json_atomic(&json_path, &result).await?;
            written.push(json_path);

            if self.config.endpoint_text_summary {
                let text_path = endpoint.dir.join(RUN_AVERAGES_TEXT);
                write_atomic(&text_path, result.render_text().as_bytes()).await?;
                written.push(text_path);
            }

            let analysis_path = endpoint.dir.join(TEST_ANALYSIS_FILE);
            write_json_atomic(&analysis_path, &analyze_endpoint(endpoint)?).await?;
            written.push(analysis_path);

            info!(
                endpoint_id = endpoint.endpoint_id,
                runs = result.total_runs,
                success_rate = ?result.success_rate,
                "Aggregated endpoint"
            );
            aggregates.push(result);
        }

        Ok((aggregates, written))
    }

    /// Aggregates plus `metrics-summary.json`; the output of `collect`
    pub async fn write_metrics(
        &self,
        collected: &CollectedResults,
    ) -> ReportResult<(Vec<EndpointAggregate>, BenchmarkSummary, ReportOutputs)> {
        let (aggregates, endpoint_aggregates) = self.aggregate_endpoints(collected).await?;
        let summary = BenchmarkSummary::from_aggregates(&aggregates, &collected.records());

        let metrics_summary = collected.root.join(METRICS_SUMMARY_FILE);
        write_json_atomic(&metrics_summary, &summary).await?;

        let outputs = ReportOutputs {
            endpoint_aggregates,
            metrics_summary,
            ..ReportOutputs::default()
        };
        Ok((aggregates, summary, outputs))
    }

    /// Write every report for the collected results
    pub async fn generate(&self, collected: &CollectedResults) -> ReportResult<ReportOutputs> {
        let (aggregates, summary, mut outputs) = self.write_metrics(collected).await?;
        let records = collected.records();
        let root = &collected.root;

        outputs.results_csv = root.join(RESULTS_CSV_FILE);
        write_atomic(&outputs.results_csv, &results_csv(&records, self.catalog.as_ref())?).await?;

        if self.config.detailed_csv {
            let path = root.join(DETAILED_CSV_FILE);
            write_atomic(&path, &detailed_csv(&records)?).await?;
            outputs.detailed_csv = Some(path);
        }

        outputs.summary_report = root.join(SUMMARY_REPORT_FILE);
        let narrative = render_markdown(
            &summary,
            &aggregates,
            self.catalog.as_ref(),
            &self.config.caveats,
        );
        write_atomic(&outputs.summary_report, narrative.as_bytes()).await?;

        info!(
            "Reports for {} run(s) written to {}",
            records.len(),
            root.display()
        );
        Ok(outputs)
    }

    /// Overlay qualitative checklists onto `benchmark-results.csv` under `root`
    pub async fn merge_manual(&self, root: &Path) -> ReportResult<usize> {
        merge_manual_evaluations(root, &root.join(RESULTS_CSV_FILE)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ResultsCollector;
    use chrono::{TimeZone, Utc};
    use genbench_core::layout::MANUAL_EVALUATION_FILE;
    use genbench_core::{
        ArtifactCounts, CoverageFigures, ErrorCounts, ErrorType, GenerationStatus, ResourceSummary,
        RunKey, RunRecord,
    };
    use genbench_storage::{FilesystemRepository, RunRepository};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(endpoint_id: u32, run_number: u32, exit_code: i32) -> RunRecord {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        RunRecord {
            endpoint_id,
            run_number,
            started_at: at,
            finished_at: at,
            duration_seconds: 62.5,
            search_budget_seconds: 60,
            exit_code,
            timed_out: false,
            generation_status: GenerationStatus::from_exit_code(exit_code),
            error_type: if exit_code == 0 {
                ErrorType::None
            } else {
                ErrorType::RmiSerialization
            },
            error_message: String::new(),
            error_counts: ErrorCounts::default(),
            resources: ResourceSummary {
                cpu_average_percent: 30.0,
                memory_peak_mb: 700.0,
                samples: 4,
            },
            artifacts: ArtifactCounts {
                tests_generated: 3,
                test_methods: 9,
                assertions: 12,
            },
            coverage: CoverageFigures::unavailable(),
        }
    }

    async fn populated() -> (TempDir, Arc<FilesystemRepository>) {
        let temp = TempDir::new().unwrap();
        let repo = Arc::new(FilesystemRepository::new(temp.path()));
        for (endpoint_id, run_number, exit_code) in [(7, 1, 0), (7, 2, 1), (8, 1, 1)] {
            let claim = repo.claim(RunKey::new(endpoint_id, run_number)).unwrap();
            repo.save(&claim, &record(endpoint_id, run_number, exit_code))
                .await
                .unwrap();
        }
        (temp, repo)
    }

    #[tokio::test]
    async fn test_generate_writes_all_outputs() {
        let (temp, repo) = populated().await;
        let collected = ResultsCollector::new(repo).collect().await.unwrap();
        let generator = ReportGenerator::new(ReportConfig::default(), None);

        let outputs = generator.generate(&collected).await.unwrap();
        assert_eq!(outputs.endpoint_aggregates.len(), 6);
        assert!(outputs.results_csv.is_file());
        assert!(outputs.detailed_csv.as_ref().unwrap().is_file());
        assert!(outputs.summary_report.is_file());
        assert!(temp.path().join("endpoint_07").join(RUN_AVERAGES_TEXT).is_file());

        let table = std::fs::read_to_string(&outputs.results_csv).unwrap();
        assert_eq!(table.lines().count(), 4);

        let summary: BenchmarkSummary =
            serde_json::from_slice(&std::fs::read(&outputs.metrics_summary).unwrap()).unwrap();
        assert_eq!(summary.total_runs, 3);
        assert_eq!(summary.all_failed_endpoints, vec![8]);
    }

    #[tokio::test]
    async fn test_regeneration_is_byte_identical() {
        let (temp, repo) = populated().await;
        let generator = ReportGenerator::new(ReportConfig::default(), None);

        let collected = ResultsCollector::new(Arc::clone(&repo)).collect().await.unwrap();
        generator.generate(&collected).await.unwrap();
        let read_all = || {
            [
                temp.path().join("endpoint_07").join(RUN_AVERAGES_JSON),
                temp.path().join(METRICS_SUMMARY_FILE),
                temp.path().join(RESULTS_CSV_FILE),
                temp.path().join(DETAILED_CSV_FILE),
                temp.path().join(SUMMARY_REPORT_FILE),
            ]
            .map(|p| std::fs::read(p).unwrap())
        };
        let first = read_all();

        let collected = ResultsCollector::new(repo).collect().await.unwrap();
        generator.generate(&collected).await.unwrap();
        assert_eq!(first, read_all());
    }

    #[tokio::test]
    async fn test_never_started_endpoint_reported_missing() {
        let (temp, repo) = populated().await;
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let run = genbench_core::BenchmarkRun::new(vec![7, 8, 9], 2, 60, started);
        write_json_atomic(
            &temp.path().join(genbench_core::layout::BENCHMARK_MANIFEST_FILE),
            &run.manifest(),
        )
        .await
        .unwrap();

        let collected = ResultsCollector::new(repo).collect().await.unwrap();
        let generator = ReportGenerator::new(ReportConfig::default(), None);
        let (_, summary, _) = generator.write_metrics(&collected).await.unwrap();

        assert_eq!(summary.missing_runs.get(&8), Some(&vec![2]));
        assert_eq!(summary.missing_runs.get(&9), Some(&vec![1, 2]));
        assert!(!summary.all_failed_endpoints.contains(&9));
        assert!(temp.path().join("endpoint_09").join(RUN_AVERAGES_JSON).is_file());

        generator.generate(&collected).await.unwrap();
        let narrative = std::fs::read_to_string(temp.path().join(SUMMARY_REPORT_FILE)).unwrap();
        assert!(narrative.contains("- Endpoint 9: run(s) 1, 2"));
    }

    #[tokio::test]
    async fn test_optional_outputs_disabled() {
        let (temp, repo) = populated().await;
        let collected = ResultsCollector::new(repo).collect().await.unwrap();
        let config = ReportConfig {
            detailed_csv: false,
            endpoint_text_summary: false,
            ..ReportConfig::default()
        };

        let outputs = ReportGenerator::new(config, None)
            .generate(&collected)
            .await
            .unwrap();
        assert!(outputs.detailed_csv.is_none());
        assert_eq!(outputs.endpoint_aggregates.len(), 4);
        assert!(!temp.path().join(DETAILED_CSV_FILE).exists());
    }

    #[tokio::test]
    async fn test_merge_after_generate() {
        let (temp, repo) = populated().await;
        let collected = ResultsCollector::new(repo).collect().await.unwrap();
        let generator = ReportGenerator::new(ReportConfig::default(), None);
        generator.generate(&collected).await.unwrap();

        std::fs::write(
            temp.path().join("endpoint_08").join(MANUAL_EVALUATION_FILE),
            "### Targets the correct endpoint\n- [x] No\n",
        )
        .unwrap();

        assert_eq!(generator.merge_manual(temp.path()).await.unwrap(), 1);
        let table = std::fs::read_to_string(temp.path().join(RESULTS_CSV_FILE)).unwrap();
        let row = table.lines().find(|l| l.starts_with("8,")).unwrap();
        assert!(row.contains(",No,"));
    }
}
