//! Benchmark Driver
//!
//! Runs every (endpoint, iteration) pair strictly one after another: the
//! target service is single-instance and the tool saturates the host, so
//! serial execution is what keeps measurements comparable.

use anyhow::{Context, Result};
use chrono::Utc;
use genbench_config::GenbenchConfig;
use genbench_core::layout::{endpoint_dir, BENCHMARK_MANIFEST_FILE};
use genbench_core::{BenchmarkRun, Catalog, EndpointDescriptor, GenerationStatus, RunKey, RunRecord};
use genbench_execution::{
    check_dependencies, ErrorClassifier, ResourceMonitor, RunExecutor, RunRequest,
    ShutdownCoordinator, SystemProbe,
};
use genbench_report::{
    CollectedResults, EndpointResults, ReportGenerator, ReportOutputs, ResultsCollector,
};
use genbench_storage::{
    write_json_atomic, FilesystemRepository, MetricsRecorder, RunAnalysis, RunRepository,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Plan for one benchmark invocation
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub runs_per_endpoint: u32,
    pub search_budget_seconds: u64,
    pub only_endpoint: Option<u32>,
    pub skip_existing: bool,
    pub inter_run_pause: Duration,
    pub inter_endpoint_pause: Duration,
}

impl DriverOptions {
    pub fn from_config(config: &GenbenchConfig) -> Self {
        let benchmark = &config.benchmark;
        Self {
            runs_per_endpoint: benchmark.runs_per_endpoint,
            search_budget_seconds: benchmark.search_budget_seconds,
            only_endpoint: None,
            skip_existing: benchmark.skip_existing,
            inter_run_pause: benchmark.inter_run_pause,
            inter_endpoint_pause: benchmark.inter_endpoint_pause,
        }
    }
}

/// Result of one (endpoint, iteration) attempt
#[derive(Debug)]
pub enum RunOutcome {
    Recorded(Box<RunRecord>),
    /// Operator interrupt; the run directory was discarded
    Cancelled,
}

pub struct BenchmarkDriver {
    config: GenbenchConfig,
    catalog: Catalog,
    repository: Arc<FilesystemRepository>,
    recorder: MetricsRecorder<FilesystemRepository>,
    executor: RunExecutor,
    classifier: ErrorClassifier,
    shutdown: ShutdownCoordinator,
}

impl BenchmarkDriver {
    pub fn new(config: GenbenchConfig, catalog: Catalog, shutdown: ShutdownCoordinator) -> Self {
        let repository = Arc::new(FilesystemRepository::new(
            config.benchmark.results_dir.clone(),
        ));
        Self {
            recorder: MetricsRecorder::new(Arc::clone(&repository)),
            executor: RunExecutor::new(config.execution.clone()),
            classifier: ErrorClassifier::with_defaults(config.classifier.max_message_chars),
            repository,
            catalog,
            shutdown,
            config,
        }
    }

    pub fn results_dir(&self) -> &Path {
        self.repository.root()
    }

    /// Fail early when the tool (or another required binary) is not installed
    pub fn preflight(&self) -> Result<()> {
        check_dependencies(&self.config.execution.binaries_to_check())
            .context("Dependency check failed")
    }

    /// Run the whole plan, then write the manifest and, unless interrupted, the reports
    pub async fn run(&self, options: &DriverOptions) -> Result<BenchmarkRun> {
        // An unknown endpoint id aborts before anything is executed
        let endpoints = self.catalog.select(options.only_endpoint)?;
        tokio::fs::create_dir_all(self.results_dir())
            .await
            .with_context(|| format!("Cannot create {}", self.results_dir().display()))?;

        let mut benchmark = BenchmarkRun::new(
            endpoints.iter().map(|e| e.id).collect(),
            options.runs_per_endpoint,
            options.search_budget_seconds,
            Utc::now(),
        );
        info!(
            benchmark_id = %benchmark.id,
            endpoints = endpoints.len(),
            runs_per_endpoint = options.runs_per_endpoint,
            search_budget = options.search_budget_seconds,
            "Starting benchmark"
        );

        'endpoints: for (index, endpoint) in endpoints.iter().enumerate() {
            if index > 0 && self.pause(options.inter_endpoint_pause).await {
                benchmark.interrupted = true;
                break;
            }
            info!(
                endpoint_id = endpoint.id,
                "Endpoint {}: {} {}",
                endpoint.id,
                endpoint.http_method,
                endpoint.path
            );

            for run_number in 1..=options.runs_per_endpoint {
                if run_number > 1 && self.pause(options.inter_run_pause).await {
                    benchmark.interrupted = true;
                    break 'endpoints;
                }
                if self.shutdown.is_shutting_down() {
                    benchmark.interrupted = true;
                    break 'endpoints;
                }

                let key = RunKey::new(endpoint.id, run_number);
                if options.skip_existing && self.repository.has_record(key).await {
                    info!("Skipping {}: record already present", key);
                    benchmark.mark_skipped(key);
                    continue;
                }

                match self
                    .run_one(endpoint, run_number, options.search_budget_seconds)
                    .await?
                {
                    RunOutcome::Recorded(record) => benchmark.push_record(*record),
                    RunOutcome::Cancelled => {
                        benchmark.interrupted = true;
                        break 'endpoints;
                    }
                }
            }

            self.aggregate_endpoint(endpoint.id, options.runs_per_endpoint)
                .await?;
        }

        benchmark.finish(Utc::now());
        self.write_manifest(&benchmark).await?;

        let tally = &benchmark.tally;
        if benchmark.interrupted {
            warn!(
                recorded = tally.recorded,
                "Benchmark interrupted; reports not regenerated"
            );
        } else {
            info!(
                recorded = tally.recorded,
                successful = tally.successful,
                failed = tally.failed,
                skipped = tally.skipped,
                "Benchmark complete"
            );
            if !benchmark.is_complete() {
                warn!(
                    "Recorded {} run(s), expected {}",
                    benchmark.records.len(),
                    benchmark.expected_record_count()
                );
            }
            self.generate_reports().await?;
        }

        Ok(benchmark)
    }

    /// Execute, classify and record one (endpoint, iteration) pair
    pub async fn run_one(
        &self,
        endpoint: &EndpointDescriptor,
        run_number: u32,
        search_budget_seconds: u64,
    ) -> Result<RunOutcome> {
        let key = RunKey::new(endpoint.id, run_number);
        let span = info_span!("run", endpoint_id = key.endpoint_id, run_number = key.run_number);
        self.run_one_inner(endpoint, key, search_budget_seconds)
            .instrument(span)
            .await
    }

    async fn run_one_inner(
        &self,
        endpoint: &EndpointDescriptor,
        key: RunKey,
        search_budget_seconds: u64,
    ) -> Result<RunOutcome> {
        let claim = self.repository.claim(key)?;
        let run_dir = self.repository.run_dir(key);
        clear_stale_run(&run_dir).await?;

        let monitor = if self.config.monitor.enabled {
            ResourceMonitor::start(SystemProbe::new(), self.config.monitor.poll_interval)
        } else {
            ResourceMonitor::disabled()
        };

        let request = RunRequest {
            endpoint,
            run_number: key.run_number,
            search_budget_seconds,
            run_dir,
        };
        let mut listener = self.shutdown.subscribe();
        let executed = self.executor.execute(&request, &mut listener).await;
        let samples = monitor.stop().await;

        let raw = match executed {
            Ok(raw) => raw,
            Err(e) if e.is_cancelled() => {
                warn!("{} cancelled; discarding partial output", key);
                self.repository.discard(claim).await?;
                return Ok(RunOutcome::Cancelled);
            }
            Err(e) => return Err(e).with_context(|| format!("Executing {}", key)),
        };

        let log = raw.read_log().await.context("Reading run log")?;
        let classification = self.classifier.classify(raw.exit_code, raw.timed_out, &log);
        let analysis = RunAnalysis::of_run_dir(&raw.run_dir, &log)?;

        let record = RunRecord {
            endpoint_id: key.endpoint_id,
            run_number: key.run_number,
            started_at: raw.started_at,
            finished_at: raw.finished_at,
            duration_seconds: raw.duration_seconds,
            search_budget_seconds: raw.search_budget_seconds,
            exit_code: raw.exit_code,
            timed_out: raw.timed_out,
            generation_status: GenerationStatus::from_exit_code(raw.exit_code),
            error_type: classification.error_type,
            error_message: classification.message,
            error_counts: classification.error_counts,
            resources: samples.summary(),
            artifacts: analysis.tests.counts(),
            coverage: analysis.coverage,
        };
        self.recorder.record(&claim, &record).await?;

        info!(
            status = %record.generation_status,
            error_type = %record.error_type,
            duration_secs = record.duration_seconds,
            tests = record.artifacts.tests_generated,
            search_completed = analysis.log.search_completed,
            "Run finished"
        );
        if analysis.log.compilation_errors && record.runs_without_error() {
            warn!("Tool exited cleanly but its log reports compilation errors");
        }
        Ok(RunOutcome::Recorded(Box::new(record)))
    }

    /// `run-one`: a single pair in isolation, with no manifest or reports
    pub async fn run_single(
        &self,
        endpoint_id: u32,
        run_number: u32,
        search_budget_seconds: u64,
    ) -> Result<RunOutcome> {
        let endpoint = self.catalog.lookup(endpoint_id)?;
        if run_number == 0 {
            anyhow::bail!("Run numbers start at 1");
        }
        tokio::fs::create_dir_all(self.results_dir()).await?;
        self.run_one(endpoint, run_number, search_budget_seconds).await
    }

    /// Collect the results tree and write every report
    pub async fn generate_reports(&self) -> Result<ReportOutputs> {
        let collected = ResultsCollector::new(Arc::clone(&self.repository))
            .collect()
            .await?;
        Ok(self.report_generator().generate(&collected).await?)
    }

    /// Refresh one endpoint's `run-averages` files as soon as its runs are done
    async fn aggregate_endpoint(&self, endpoint_id: u32, expected_runs: u32) -> Result<()> {
        let root = self.results_dir().to_path_buf();
        let records = self.repository.load_endpoint(endpoint_id).await?;
        let collected = CollectedResults {
            endpoints: vec![EndpointResults {
                endpoint_id,
                dir: endpoint_dir(&root, endpoint_id),
                expected_runs: Some(expected_runs),
                records,
                unrecorded: Vec::new(),
            }],
            root,
            manifest: None,
        };
        self.report_generator()
            .aggregate_endpoints(&collected)
            .await?;
        Ok(())
    }

    fn report_generator(&self) -> ReportGenerator {
        ReportGenerator::new(self.config.report.clone(), Some(self.catalog.clone()))
    }

    async fn write_manifest(&self, benchmark: &BenchmarkRun) -> Result<PathBuf> {
        let path = self.results_dir().join(BENCHMARK_MANIFEST_FILE);
        write_json_atomic(&path, &benchmark.manifest())
            .await
            .with_context(|| format!("Writing {}", path.display()))?;
        Ok(path)
    }

    /// Sleep between runs; true when an interrupt arrived meanwhile
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.shutdown.is_shutting_down();
        }
        let mut listener = self.shutdown.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = listener.wait() => true,
        }
    }
}

/// A re-run replaces whatever an earlier attempt left in the directory
async fn clear_stale_run(run_dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(run_dir).await {
        Ok(()) => {
            info!("Replacing earlier output in {}", run_dir.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Cannot clear {}", run_dir.display())),
    }
}
