//! Run record repository

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use genbench_core::layout::{self, parse_numbered_dir, EXIT_STATUS_FILE, RESOURCE_METRICS_FILE};
use genbench_core::{ExitStatusRecord, ResourceMetricsRecord, RunKey, RunRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::fs;
use tracing::{debug, info, warn};

type ClaimSet = Arc<Mutex<HashSet<RunKey>>>;

fn lock(claims: &ClaimSet) -> MutexGuard<'_, HashSet<RunKey>> {
    claims.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Exclusive right to write one run's directory. Released on drop.
#[derive(Debug)]
pub struct RunClaim {
    key: RunKey,
    claims: ClaimSet,
}

impl RunClaim {
    pub fn key(&self) -> RunKey {
        self.key
    }
}

impl Drop for RunClaim {
    fn drop(&mut self) {
        lock(&self.claims).remove(&self.key);
    }
}

/// A run directory found in the store, with its record if one is complete
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub key: RunKey,
    pub dir: PathBuf,
    pub record: Option<RunRecord>,
}

/// Durable store of run records with one writer per run
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Root of the store
    fn root(&self) -> &Path;

    /// Directory owned by a run
    fn run_dir(&self, key: RunKey) -> PathBuf {
        layout::run_dir(self.root(), key)
    }

    /// Take the single-writer claim on a run
    fn claim(&self, key: RunKey) -> StorageResult<RunClaim>;

    /// Persist both halves of a finished record
    async fn save(&self, claim: &RunClaim, record: &RunRecord) -> StorageResult<PathBuf>;

    /// Load a record; `None` when the run has no record files at all
    async fn load(&self, key: RunKey) -> StorageResult<Option<RunRecord>>;

    /// Whether a complete, parseable record exists
    async fn has_record(&self, key: RunKey) -> bool {
        matches!(self.load(key).await, Ok(Some(_)))
    }

    /// Endpoint ids with a directory in the store, ascending
    async fn list_endpoints(&self) -> StorageResult<Vec<u32>>;

    /// Every run directory of an endpoint, ascending by run number
    async fn list_runs(&self, endpoint_id: u32) -> StorageResult<Vec<StoredRun>>;

    /// Complete records of an endpoint, ascending by run number
    async fn load_endpoint(&self, endpoint_id: u32) -> StorageResult<Vec<RunRecord>> {
        Ok(self
            .list_runs(endpoint_id)
            .await?
            .into_iter()
            .filter_map(|run| run.record)
            .collect())
    }

    /// Remove a run directory that was never completed
    async fn discard(&self, claim: RunClaim) -> StorageResult<()>;
}

/// Repository over the `endpoint_NN/run_NN` results tree
#[derive(Debug, Clone)]
pub struct FilesystemRepository {
    root: PathBuf,
    claims: ClaimSet,
}

impl FilesystemRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            claims: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    async fn numbered_children(dir: &Path, prefix: &str) -> StorageResult<Vec<(u32, PathBuf)>> {
        let mut found = Vec::new();
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Some(number) = name.to_str().and_then(|n| parse_numbered_dir(n, prefix)) {
                found.push((number, entry.path()));
            }
        }
        found.sort_by_key(|(number, _)| *number);
        Ok(found)
    }
}

#[async_trait]
impl RunRepository for FilesystemRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn claim(&self, key: RunKey) -> StorageResult<RunClaim> {
        let mut claims = lock(&self.claims);
        if !claims.insert(key) {
            return Err(StorageError::AlreadyClaimed(key));
        }
        debug!("Claimed run directory for {}", key);
        Ok(RunClaim {
            key,
            claims: Arc::clone(&self.claims),
        })
    }

    async fn save(&self, claim: &RunClaim, record: &RunRecord) -> StorageResult<PathBuf> {
        if claim.key != record.key() {
            return Err(StorageError::ClaimMismatch {
                claimed: claim.key,
                record: record.key(),
            });
        }

        let dir = self.run_dir(claim.key);
        fs::create_dir_all(&dir).await?;

        let (resource, status) = record.to_parts();
        write_json_atomic(&dir.join(RESOURCE_METRICS_FILE), &resource).await?;
        write_json_atomic(&dir.join(EXIT_STATUS_FILE), &status).await?;

        info!(
            endpoint_id = record.endpoint_id,
            run_number = record.run_number,
            error_type = %record.error_type,
            "Recorded run in {}",
            dir.display()
        );
        Ok(dir)
    }

    async fn load(&self, key: RunKey) -> StorageResult<Option<RunRecord>> {
        let dir = self.run_dir(key);
        let resource_path = dir.join(RESOURCE_METRICS_FILE);
        let status_path = dir.join(EXIT_STATUS_FILE);

        let resource: Option<ResourceMetricsRecord> = read_json(&resource_path).await?;
        let status: Option<ExitStatusRecord> = read_json(&status_path).await?;

        match (resource, status) {
            (Some(resource), Some(status)) => Ok(Some(RunRecord::from_parts(resource, status)?)),
            (None, None) => Ok(None),
            (Some(_), None) => Err(StorageError::Incomplete {
                key,
                missing: status_path,
            }),
            (None, Some(_)) => Err(StorageError::Incomplete {
                key,
                missing: resource_path,
            }),
        }
    }

    async fn list_endpoints(&self) -> StorageResult<Vec<u32>> {
        Ok(Self::numbered_children(&self.root, "endpoint")
            .await?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }

    async fn list_runs(&self, endpoint_id: u32) -> StorageResult<Vec<StoredRun>> {
        let endpoint_dir = layout::endpoint_dir(&self.root, endpoint_id);
        let mut runs = Vec::new();

        for (run_number, dir) in Self::numbered_children(&endpoint_dir, "run").await? {
            let key = RunKey::new(endpoint_id, run_number);
            let record = match self.load(key).await {
                Ok(record) => record,
                Err(e) => {
                    warn!("Ignoring unreadable record for {}: {}", key, e);
                    None
                }
            };
            runs.push(StoredRun { key, dir, record });
        }
        Ok(runs)
    }

    async fn discard(&self, claim: RunClaim) -> StorageResult<()> {
        let dir = self.run_dir(claim.key);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Discarded unfinished run directory {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write JSON to a sibling temp file, then rename it over the target
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes).await
}

/// Write bytes to a sibling temp file, then rename it over the target
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use genbench_core::{
        ArtifactCounts, CoverageFigures, ErrorCounts, ErrorType, GenerationStatus,
        ResourceSummary,
    };
    use tempfile::TempDir;

    fn record(endpoint_id: u32, run_number: u32) -> RunRecord {
        RunRecord {
            endpoint_id,
            run_number,
            started_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 1, 3).unwrap(),
            duration_seconds: 63.127,
            search_budget_seconds: 60,
            exit_code: 1,
            timed_out: false,
            generation_status: GenerationStatus::Failed,
            error_type: ErrorType::RmiSerialization,
            error_message: "java.lang.NoClassDefFoundError: org/springframework/http/HttpEntity"
                .to_string(),
            error_counts: ErrorCounts {
                total_errors: 2,
                missing_packages: 0,
                missing_symbols: 0,
            },
            resources: ResourceSummary {
                cpu_average_percent: 37.41,
                memory_peak_mb: 2048.33,
                samples: 13,
            },
            artifacts: ArtifactCounts::default(),
            coverage: CoverageFigures::unavailable(),
        }
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let repo = FilesystemRepository::new(temp.path());
        let original = record(7, 1);

        let claim = repo.claim(original.key()).unwrap();
        let dir = repo.save(&claim, &original).await.unwrap();
        assert_eq!(dir, temp.path().join("endpoint_07").join("run_01"));
        assert!(dir.join(RESOURCE_METRICS_FILE).exists());
        assert!(dir.join(EXIT_STATUS_FILE).exists());
        assert!(!dir.join(".exit-status.json.tmp").exists());

        let loaded = repo.load(original.key()).await.unwrap().unwrap();
        assert_eq!(loaded, original);
        assert!(repo.has_record(original.key()).await);
    }

    #[tokio::test]
    async fn test_rewriting_loaded_record_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let repo = FilesystemRepository::new(temp.path());
        let original = record(3, 2);
        let claim = repo.claim(original.key()).unwrap();
        let dir = repo.save(&claim, &original).await.unwrap();
        let first = std::fs::read(dir.join(RESOURCE_METRICS_FILE)).unwrap();

        let loaded = repo.load(original.key()).await.unwrap().unwrap();
        repo.save(&claim, &loaded).await.unwrap();
        let second = std::fs::read(dir.join(RESOURCE_METRICS_FILE)).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_one_writer_per_run() {
        let temp = TempDir::new().unwrap();
        let repo = FilesystemRepository::new(temp.path());
        let key = RunKey::new(1, 1);

        let claim = repo.claim(key).unwrap();
        assert!(matches!(repo.claim(key), Err(StorageError::AlreadyClaimed(k)) if k == key));
        assert!(repo.claim(RunKey::new(1, 2)).is_ok());

        let err = repo.save(&claim, &record(1, 2)).await.unwrap_err();
        assert!(matches!(err, StorageError::ClaimMismatch { .. }));

        drop(claim);
        assert!(repo.claim(key).is_ok());
    }

    #[tokio::test]
    async fn test_listing_and_partial_records() {
        let temp = TempDir::new().unwrap();
        let repo = FilesystemRepository::new(temp.path());

        for run in [1, 3] {
            let rec = record(2, run);
            let claim = repo.claim(rec.key()).unwrap();
            repo.save(&claim, &rec).await.unwrap();
        }
        // A run directory left without records
        std::fs::create_dir_all(temp.path().join("endpoint_02").join("run_02")).unwrap();
        std::fs::create_dir_all(temp.path().join("endpoint_05")).unwrap();
        std::fs::create_dir_all(temp.path().join("not-an-endpoint")).unwrap();

        assert_eq!(repo.list_endpoints().await.unwrap(), vec![2, 5]);

        let runs = repo.list_runs(2).await.unwrap();
        let numbers: Vec<u32> = runs.iter().map(|r| r.key.run_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(runs[1].record.is_none());

        let records = repo.load_endpoint(2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(repo.list_runs(9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_and_corrupt_records() {
        let temp = TempDir::new().unwrap();
        let repo = FilesystemRepository::new(temp.path());
        let key = RunKey::new(4, 1);
        let dir = repo.run_dir(key);
        std::fs::create_dir_all(&dir).unwrap();

        std::fs::write(dir.join(EXIT_STATUS_FILE), "{}").unwrap();
        assert!(matches!(
            repo.load(key).await,
            Err(StorageError::Corrupt { .. })
        ));

        let (_, status) = record(4, 1).to_parts();
        std::fs::write(dir.join(EXIT_STATUS_FILE), serde_json::to_vec(&status).unwrap()).unwrap();
        assert!(matches!(
            repo.load(key).await,
            Err(StorageError::Incomplete { .. })
        ));
        assert!(!repo.has_record(key).await);
    }

    #[tokio::test]
    async fn test_discard_removes_run_directory() {
        let temp = TempDir::new().unwrap();
        let repo = FilesystemRepository::new(temp.path());
        let key = RunKey::new(6, 1);
        let dir = repo.run_dir(key);
        std::fs::create_dir_all(dir.join("generated-tests")).unwrap();
        std::fs::write(dir.join("evosuite-output.log"), "partial").unwrap();

        let claim = repo.claim(key).unwrap();
        repo.discard(claim).await.unwrap();
        assert!(!dir.exists());
        // Claim released by discard
        assert!(repo.claim(key).is_ok());
    }
}
