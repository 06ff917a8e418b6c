//! Gathers run records from an existing results tree

use crate::error::{ReportError, ReportResult};
use genbench_core::layout::{endpoint_dir, BENCHMARK_MANIFEST_FILE};
use genbench_core::{BenchmarkManifest, RunRecord};
use genbench_storage::RunRepository;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Records and bookkeeping for one `endpoint_NN` directory
#[derive(Debug, Clone)]
pub struct EndpointResults {
    pub endpoint_id: u32,
    pub dir: PathBuf,
    /// Planned iteration count, when it can be determined
    pub expected_runs: Option<u32>,
    /// Complete records in run order
    pub records: Vec<RunRecord>,
    /// Run directories that exist without a complete record
    pub unrecorded: Vec<u32>,
}

/// Everything the report generator reads from a results tree
#[derive(Debug, Clone)]
pub struct CollectedResults {
    pub root: PathBuf,
    pub manifest: Option<BenchmarkManifest>,
    pub endpoints: Vec<EndpointResults>,
}

impl CollectedResults {
    /// All records, ordered by endpoint then run
    pub fn records(&self) -> Vec<RunRecord> {
        self.endpoints
            .iter()
            .flat_map(|e| e.records.iter().cloned())
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.endpoints.iter().map(|e| e.records.len()).sum()
    }
}

/// Reads a results tree through a [`RunRepository`]
pub struct ResultsCollector<R: RunRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: RunRepository + ?Sized> ResultsCollector<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn collect(&self) -> ReportResult<CollectedResults> {
        let root = self.repository.root().to_path_buf();
        if !root.is_dir() {
            return Err(ReportError::MissingResults(root));
        }

        let manifest = read_manifest(&root).await;
        let mut endpoints = Vec::new();

        // Requested endpoints that never got a directory still owe their runs
        let mut endpoint_ids: BTreeSet<u32> =
            self.repository.list_endpoints().await?.into_iter().collect();
        if let Some(manifest) = &manifest {
            for &endpoint_id in &manifest.endpoint_ids {
                if endpoint_ids.insert(endpoint_id) {
                    warn!(endpoint_id, "Requested endpoint has no results directory");
                }
            }
        }

        for endpoint_id in endpoint_ids {
            let runs = self.repository.list_runs(endpoint_id).await?;
            let highest_run = runs.iter().map(|r| r.key.run_number).max();

            let expected_runs = manifest
                .as_ref()
                .filter(|m| m.endpoint_ids.contains(&endpoint_id))
                .map(|m| m.runs_per_endpoint)
                .or(highest_run);

            let mut records = Vec::new();
            let mut unrecorded = Vec::new();
            for run in runs {
                match run.record {
                    Some(record) => records.push(record),
                    None => unrecorded.push(run.key.run_number),
                }
            }

            if !unrecorded.is_empty() {
                warn!(
                    endpoint_id,
                    "Run directories without a complete record: {:?}", unrecorded
                );
            }
            debug!(endpoint_id, records = records.len(), "Collected endpoint");

            endpoints.push(EndpointResults {
                endpoint_id,
                dir: endpoint_dir(&root, endpoint_id),
                expected_runs,
                records,
                unrecorded,
            });
        }

        let collected = CollectedResults {
            root,
            manifest,
            endpoints,
        };
        info!(
            "Collected {} record(s) across {} endpoint(s) from {}",
            collected.record_count(),
            collected.endpoints.len(),
            collected.root.display()
        );
        Ok(collected)
    }
}

async fn read_manifest(root: &Path) -> Option<BenchmarkManifest> {
    let path = root.join(BENCHMARK_MANIFEST_FILE);
    let bytes = tokio::fs::read(&path).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!("Ignoring unreadable manifest {}: {}", path.display(), e);
            None
        }
    }
}
