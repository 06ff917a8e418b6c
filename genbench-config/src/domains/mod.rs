//! Domain-specific configuration modules

pub mod benchmark;
pub mod classifier;
pub mod execution;
pub mod logging;
pub mod monitor;
pub mod report;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main genbench configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GenbenchConfig {
    /// What to run and where results go
    #[serde(default)]
    pub benchmark: benchmark::BenchmarkConfig,

    /// How the external tool is launched and bounded
    #[serde(default)]
    pub execution: execution::ExecutionConfig,

    /// Concurrent resource sampling
    #[serde(default)]
    pub monitor: monitor::MonitorConfig,

    /// Failure classification
    #[serde(default)]
    pub classifier: classifier::ClassifierConfig,

    /// Report generation
    #[serde(default)]
    pub report: report::ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl GenbenchConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.benchmark.validate()?;
        self.execution.validate()?;
        self.monitor.validate()?;
        self.classifier.validate()?;
        self.report.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = GenbenchConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
