//! Resource monitor configuration

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sample CPU and memory while a run is active
    #[serde(default = "crate::domains::utils::default_true")]
    pub enabled: bool,

    /// Interval between samples
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_poll_interval")]
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: default_poll_interval(),
        }
    }
}

impl Validatable for MonitorConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.enabled && self.poll_interval.is_zero() {
            return Err(self.validation_error("poll_interval must be greater than 0"));
        }
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "monitor"
    }
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}
