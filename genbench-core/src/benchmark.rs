//! Top-level benchmark container and result accumulator

use crate::record::{RunKey, RunRecord};
use crate::types::ErrorType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running tallies across a benchmark, passed by reference through the driver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    pub recorded: u32,
    pub successful: u32,
    pub failed: u32,
    pub timed_out: u32,
    pub skipped: u32,
    pub error_types: BTreeMap<ErrorType, u32>,
}

impl RunTally {
    pub fn observe(&mut self, record: &RunRecord) {
        self.recorded += 1;
        if record.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
            *self.error_types.entry(record.error_type).or_default() += 1;
        }
        if record.timed_out {
            self.timed_out += 1;
        }
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }
}

/// One benchmark invocation and every record it produced
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub id: String,
    pub endpoint_ids: Vec<u32>,
    pub runs_per_endpoint: u32,
    pub search_budget_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub records: Vec<RunRecord>,
    pub skipped: Vec<RunKey>,
    pub interrupted: bool,
    pub tally: RunTally,
}

impl BenchmarkRun {
    pub fn new(
        endpoint_ids: Vec<u32>,
        runs_per_endpoint: u32,
        search_budget_seconds: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::id_for(started_at),
            endpoint_ids,
            runs_per_endpoint,
            search_budget_seconds,
            started_at,
            finished_at: None,
            records: Vec::new(),
            skipped: Vec::new(),
            interrupted: false,
            tally: RunTally::default(),
        }
    }

    /// Timestamp-named identity, e.g. `benchmark_20260301_100000`
    pub fn id_for(started_at: DateTime<Utc>) -> String {
        format!("benchmark_{}", started_at.format("%Y%m%d_%H%M%S"))
    }

    pub fn push_record(&mut self, record: RunRecord) {
        self.tally.observe(&record);
        self.records.push(record);
    }

    pub fn mark_skipped(&mut self, key: RunKey) {
        self.tally.skip();
        self.skipped.push(key);
    }

    /// Records a finished benchmark must hold
    pub fn expected_record_count(&self) -> usize {
        let planned = self.endpoint_ids.len() * self.runs_per_endpoint as usize;
        planned.saturating_sub(self.skipped.len())
    }

    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.records.len() == self.expected_record_count()
    }

    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.finished_at = Some(finished_at);
    }

    pub fn manifest(&self) -> BenchmarkManifest {
        BenchmarkManifest {
            id: self.id.clone(),
            endpoint_ids: self.endpoint_ids.clone(),
            runs_per_endpoint: self.runs_per_endpoint,
            search_budget_seconds: self.search_budget_seconds,
            started_at: self.started_at,
            finished_at: self.finished_at,
            recorded_runs: self.records.len(),
            skipped_runs: self.skipped.clone(),
            interrupted: self.interrupted,
            tally: self.tally.clone(),
        }
    }
}

/// Contents of `benchmark-run.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkManifest {
    pub id: String,
    pub endpoint_ids: Vec<u32>,
    pub runs_per_endpoint: u32,
    pub search_budget_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub recorded_runs: usize,
    pub skipped_runs: Vec<RunKey>,
    pub interrupted: bool,
    pub tally: RunTally,
}
