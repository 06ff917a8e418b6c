//! Tool command templating and dependency checks

use crate::error::{ExecutionError, ExecutionResult};
use genbench_config::domains::execution::TEMPLATE_PLACEHOLDERS;
use genbench_config::ToolCommand;
use genbench_core::layout::{GENERATED_TESTS_DIR, TOOL_REPORT_DIR};
use genbench_core::EndpointDescriptor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Values substituted into a tool command template for one run
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub endpoint: &'a EndpointDescriptor,
    pub run_number: u32,
    pub search_budget_seconds: u64,
    pub output_dir: PathBuf,
}

impl<'a> RunContext<'a> {
    pub fn new(
        endpoint: &'a EndpointDescriptor,
        run_number: u32,
        search_budget_seconds: u64,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            endpoint,
            run_number,
            search_budget_seconds,
            output_dir: output_dir.into(),
        }
    }

    pub fn tests_dir(&self) -> PathBuf {
        self.output_dir.join(GENERATED_TESTS_DIR)
    }

    pub fn report_dir(&self) -> PathBuf {
        self.output_dir.join(TOOL_REPORT_DIR)
    }

    fn value_of(&self, placeholder: &str) -> Option<String> {
        let value = match placeholder {
            "endpoint_id" => self.endpoint.id.to_string(),
            "run_number" => self.run_number.to_string(),
            "controller_class" => self.endpoint.controller_class.clone(),
            "method_name" => self.endpoint.method_name.clone(),
            "service" => self.endpoint.service.clone(),
            "search_budget" => self.search_budget_seconds.to_string(),
            "output_dir" => self.output_dir.display().to_string(),
            "tests_dir" => self.tests_dir().display().to_string(),
            "report_dir" => self.report_dir().display().to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Substitute every known `{placeholder}` in `template`
    pub fn render(&self, template: &str) -> String {
        let mut rendered = template.to_string();
        for placeholder in TEMPLATE_PLACEHOLDERS {
            let field = format!("{{{}}}", placeholder);
            if rendered.contains(&field) {
                if let Some(value) = self.value_of(placeholder) {
                    rendered = rendered.replace(&field, &value);
                }
            }
        }
        rendered
    }

    /// Build the tool invocation for this run
    pub fn tool_command(&self, tool: &ToolCommand) -> Command {
        let mut cmd = Command::new(self.render(&tool.program));
        cmd.args(tool.args.iter().map(|arg| self.render(arg)));
        for (key, value) in &tool.env {
            cmd.env(key, self.render(value));
        }
        if let Some(dir) = &tool.working_dir {
            cmd.current_dir(self.render(&dir.display().to_string()));
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// Build the post-kill cleanup invocation, if one is configured
    pub fn cleanup_command(&self, tool: &ToolCommand) -> Option<Command> {
        let (program, args) = tool.cleanup.split_first()?;
        let mut cmd = Command::new(self.render(program));
        cmd.args(args.iter().map(|arg| self.render(arg)))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        Some(cmd)
    }
}

/// Locate a program the way a shell would
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|full| is_executable(full))
}

/// Fail with the first binary that cannot be found
pub fn check_dependencies(binaries: &[String]) -> ExecutionResult<()> {
    for binary in binaries {
        match find_on_path(binary) {
            Some(path) => tracing::debug!("Found {} at {}", binary, path.display()),
            None => return Err(ExecutionError::MissingDependency(binary.clone())),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
