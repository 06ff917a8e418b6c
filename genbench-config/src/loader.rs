//! Configuration loading and environment variable handling

use crate::domains::GenbenchConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "GENBENCH".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<GenbenchConfig> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let mut config: GenbenchConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<GenbenchConfig> {
        debug!("No configuration file; using defaults with {}_* overrides", self.prefix);
        let mut config = GenbenchConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<GenbenchConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut GenbenchConfig) -> ConfigResult<()> {
        self.apply_benchmark_overrides(&mut config.benchmark)?;
        self.apply_execution_overrides(&mut config.execution)?;
        self.apply_monitor_overrides(&mut config.monitor)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    fn apply_benchmark_overrides(
        &self,
        config: &mut crate::domains::benchmark::BenchmarkConfig,
    ) -> ConfigResult<()> {
        if let Ok(catalog) = self.get_env_var("CATALOG") {
            config.catalog_path = PathBuf::from(catalog);
        }

        if let Ok(results) = self.get_env_var("RESULTS_DIR") {
            config.results_dir = PathBuf::from(results);
        }

        if let Some(runs) = self.parse_env_var("RUNS")? {
            config.runs_per_endpoint = runs;
        }

        if let Some(budget) = self.parse_env_var("SEARCH_BUDGET")? {
            config.search_budget_seconds = budget;
        }

        if let Some(skip) = self.parse_env_var("SKIP_EXISTING")? {
            config.skip_existing = skip;
        }

        Ok(())
    }

    fn apply_execution_overrides(
        &self,
        config: &mut crate::domains::execution::ExecutionConfig,
    ) -> ConfigResult<()> {
        if let Ok(program) = self.get_env_var("TOOL_PROGRAM") {
            config.tool.program = program;
        }

        if let Some(multiplier) = self.parse_env_var("DEADLINE_MULTIPLIER")? {
            config.deadline_multiplier = multiplier;
        }

        Ok(())
    }

    fn apply_monitor_overrides(
        &self,
        config: &mut crate::domains::monitor::MonitorConfig,
    ) -> ConfigResult<()> {
        if let Some(seconds) = self.parse_env_var::<u64>("POLL_INTERVAL")? {
            config.poll_interval = Duration::from_secs(seconds);
        }

        if let Some(enabled) = self.parse_env_var("MONITOR_ENABLED")? {
            config.enabled = enabled;
        }

        Ok(())
    }

    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Parse an optional environment variable into `T`
    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_env_var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| ConfigError::EnvError(format!("Invalid {}: {}", name, e))),
            Err(_) => Ok(None),
        }
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        let key = format!("{}_{}", self.prefix, name);
        let value = std::env::var(&key)?;
        debug!(variable = %key, "Applying environment override");
        Ok(value)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
