//! External tool execution configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholders a tool command template may reference
pub const TEMPLATE_PLACEHOLDERS: &[&str] = &[
    "endpoint_id",
    "run_number",
    "controller_class",
    "method_name",
    "service",
    "search_budget",
    "output_dir",
    "tests_dir",
    "report_dir",
];

/// How one run of the external tool is launched and bounded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Command template for the tool
    #[serde(default)]
    pub tool: ToolCommand,

    /// Deadline = search budget x this multiplier
    #[serde(default = "default_deadline_multiplier")]
    pub deadline_multiplier: u32,

    /// Exit code recorded for runs killed at the deadline
    #[serde(default = "default_timeout_exit_code")]
    pub timeout_exit_code: i32,

    /// How long to wait for a killed process to be reaped
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_kill_grace_period")]
    pub kill_grace_period: Duration,

    /// Name of the per-run log file
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,

    /// Binaries that must be on PATH before a benchmark starts.
    /// Empty means just the tool program.
    #[serde(default)]
    pub required_binaries: Vec<String>,
}

/// Command template; every string may contain `{placeholder}` fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCommand {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_args")]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Command run after a deadline kill, to remove anything the tool left behind
    #[serde(default = "default_cleanup")]
    pub cleanup: Vec<String>,
}

impl ExecutionConfig {
    /// Binaries to check before the first run
    pub fn binaries_to_check(&self) -> Vec<String> {
        if self.required_binaries.is_empty() {
            vec![self.tool.program.clone()]
        } else {
            self.required_binaries.clone()
        }
    }

    /// Hard deadline for a given search budget
    pub fn deadline_for(&self, search_budget_seconds: u64) -> Duration {
        Duration::from_secs(search_budget_seconds.saturating_mul(self.deadline_multiplier as u64))
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            tool: ToolCommand::default(),
            deadline_multiplier: default_deadline_multiplier(),
            timeout_exit_code: default_timeout_exit_code(),
            kill_grace_period: default_kill_grace_period(),
            log_file_name: default_log_file_name(),
            required_binaries: Vec::new(),
        }
    }
}

impl Default for ToolCommand {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            env: BTreeMap::new(),
            working_dir: None,
            cleanup: default_cleanup(),
        }
    }
}

impl Validatable for ExecutionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.deadline_multiplier, "deadline_multiplier", self.domain_name())?;
        validate_required_string(&self.log_file_name, "log_file_name", self.domain_name())?;

        if self.timeout_exit_code == 0 {
            return Err(self.validation_error("timeout_exit_code must be non-zero"));
        }
        if self.log_file_name.contains(['/', '\\']) {
            return Err(self.validation_error("log_file_name must be a bare file name"));
        }

        self.tool.validate()?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution"
    }
}

impl Validatable for ToolCommand {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.program, "program", self.domain_name())?;

        let templates = std::iter::once(&self.program)
            .chain(self.args.iter())
            .chain(self.env.values())
            .chain(self.cleanup.iter());
        for template in templates {
            for name in placeholders(template) {
                if !TEMPLATE_PLACEHOLDERS.contains(&name) {
                    return Err(self.validation_error(format!(
                        "unknown placeholder '{{{}}}' in '{}'. Valid placeholders: {}",
                        name,
                        template,
                        TEMPLATE_PLACEHOLDERS.join(", ")
                    )));
                }
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "execution.tool"
    }
}

/// Names of the `{placeholder}` fields in a template
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

// Default value functions
fn default_deadline_multiplier() -> u32 {
    3
}

fn default_timeout_exit_code() -> i32 {
    124
}

fn default_kill_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_log_file_name() -> String {
    "evosuite-output.log".to_string()
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_args() -> Vec<String> {
    [
        "run",
        "--rm",
        "--name",
        "genbench-{endpoint_id}-{run_number}",
        "-v",
        "{output_dir}:/results",
        "evosuite-runner:latest",
        "-class",
        "{controller_class}",
        "-Dsearch_budget={search_budget}",
        "-Dtest_dir=/results/generated-tests",
        "-Dreport_dir=/results/evosuite-report",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

fn default_cleanup() -> Vec<String> {
    ["docker", "rm", "-f", "genbench-{endpoint_id}-{run_number}"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}
