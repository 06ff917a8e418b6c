//! Benchmark plan configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to run, how often, and where results go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Endpoint catalog (CSV)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Root of the results tree
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Iterations per endpoint
    #[serde(default = "default_runs_per_endpoint")]
    pub runs_per_endpoint: u32,

    /// Search budget handed to the tool, in seconds
    #[serde(default = "default_search_budget_seconds")]
    pub search_budget_seconds: u64,

    /// Pause between iterations of one endpoint
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_inter_run_pause")]
    pub inter_run_pause: Duration,

    /// Pause between endpoints
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_inter_endpoint_pause")]
    pub inter_endpoint_pause: Duration,

    /// Keep runs that already have a complete record instead of re-running them
    #[serde(default = "crate::domains::utils::default_false")]
    pub skip_existing: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            results_dir: default_results_dir(),
            runs_per_endpoint: default_runs_per_endpoint(),
            search_budget_seconds: default_search_budget_seconds(),
            inter_run_pause: default_inter_run_pause(),
            inter_endpoint_pause: default_inter_endpoint_pause(),
            skip_existing: false,
        }
    }
}

impl Validatable for BenchmarkConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.runs_per_endpoint, "runs_per_endpoint", self.domain_name())?;
        validate_positive(
            self.search_budget_seconds,
            "search_budget_seconds",
            self.domain_name(),
        )?;

        if self.catalog_path.as_os_str().is_empty() {
            return Err(self.validation_error("catalog_path cannot be empty"));
        }
        if self.results_dir.as_os_str().is_empty() {
            return Err(self.validation_error("results_dir cannot be empty"));
        }
        if self.runs_per_endpoint > 99 {
            return Err(self.validation_error(format!(
                "runs_per_endpoint must be at most 99, got {}",
                self.runs_per_endpoint
            )));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "benchmark"
    }
}

// Default value functions
fn default_catalog_path() -> PathBuf {
    PathBuf::from("config/endpoints.csv")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_runs_per_endpoint() -> u32 {
    5
}

fn default_search_budget_seconds() -> u64 {
    60
}

fn default_inter_run_pause() -> Duration {
    Duration::from_secs(5)
}

fn default_inter_endpoint_pause() -> Duration {
    Duration::from_secs(10)
}
