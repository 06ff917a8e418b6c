//! Shared fixtures: fake tool scripts and a benchmark config pointing at them

#![allow(dead_code)]

use genbench_cli::BenchmarkDriver;
use genbench_config::{GenbenchConfig, ToolCommand};
use genbench_core::Catalog;
use genbench_execution::ShutdownCoordinator;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Arguments handed to every fake tool: `$1` tests dir, `$2` report dir,
/// `$3` controller class, `$4` endpoint id, `$5` run number
pub const TOOL_ARGS: &[&str] = &[
    "{tests_dir}",
    "{report_dir}",
    "{controller_class}",
    "{endpoint_id}",
    "{run_number}",
];

/// Writes one test class with two test methods and two assertions, plus a statistics file
pub const SUCCESS_TOOL: &str = r#"echo "* Going to generate test cases for class: $3"
cat > "$1/ContactsController_ESTest.java" <<'EOF'
public class ContactsController_ESTest {
  @Test(timeout = 4000)
  public void test0() throws Throwable {
    assertEquals(200, response.getStatusCodeValue());
  }

  @Test(timeout = 4000)
  public void test1() throws Throwable {
    assertNotNull(controller);
  }
}
EOF
printf 'TARGET_CLASS,criterion,Coverage,Total_Goals,Covered_Goals\n%s,LINE,0.75,40,30\n' "$3" > "$2/statistics.csv"
echo "* Search finished"
exit 0"#;

pub const RMI_FAILURE_TOOL: &str = r#"echo "* Going to generate test cases for class: $3"
echo "java.lang.NoClassDefFoundError: org/springframework/http/HttpEntity"
echo "	at java.lang.Class.getDeclaredMethods0(Native Method)"
echo 'Exception in thread "main" java.lang.RuntimeException' >&2
exit 1"#;

pub const HUNG_TOOL: &str = r#"echo "* Going to generate test cases for class: $3"
sleep 30
echo "never printed""#;

pub fn catalog_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("config")
        .join("endpoints.csv")
}

pub fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Serial, pause-free configuration writing results under `workdir/results`
pub fn bench_config(workdir: &Path, tool: &Path) -> GenbenchConfig {
    let mut config = GenbenchConfig::default();

    config.benchmark.catalog_path = catalog_path();
    config.benchmark.results_dir = workdir.join("results");
    config.benchmark.runs_per_endpoint = 1;
    config.benchmark.search_budget_seconds = 5;
    config.benchmark.inter_run_pause = Duration::ZERO;
    config.benchmark.inter_endpoint_pause = Duration::ZERO;

    config.execution.tool = ToolCommand {
        program: tool.display().to_string(),
        args: TOOL_ARGS.iter().map(|a| a.to_string()).collect(),
        cleanup: Vec::new(),
        ..ToolCommand::default()
    };
    config.execution.kill_grace_period = Duration::from_millis(500);

    config.monitor.enabled = false;
    config
}

pub fn driver(config: GenbenchConfig) -> BenchmarkDriver {
    driver_with_shutdown(config, ShutdownCoordinator::new())
}

pub fn driver_with_shutdown(config: GenbenchConfig, shutdown: ShutdownCoordinator) -> BenchmarkDriver {
    let catalog = Catalog::load(&config.benchmark.catalog_path).unwrap();
    BenchmarkDriver::new(config, catalog, shutdown)
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    serde_json::from_str(&text).unwrap()
}
