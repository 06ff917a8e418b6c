//! Domain-driven configuration management for genbench
//!
//! Configuration is split by functional domain, each with its own defaults
//! and validation. Values come from an optional YAML file and are then
//! overridden by `GENBENCH_*` environment variables.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    benchmark::BenchmarkConfig,
    classifier::ClassifierConfig,
    execution::{ExecutionConfig, ToolCommand},
    logging::{LogFormat, LogLevel, LogRotation, LogTarget, LoggingConfig},
    monitor::MonitorConfig,
    report::ReportConfig,
    GenbenchConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
