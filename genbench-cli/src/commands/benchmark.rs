//! `genbench run` and `genbench run-one`

use super::Completion;
use crate::driver::{BenchmarkDriver, DriverOptions, RunOutcome};
use anyhow::{Context, Result};
use colored::Colorize;
use genbench_config::GenbenchConfig;
use genbench_core::{BenchmarkRun, Catalog};
use genbench_execution::ShutdownCoordinator;
use std::path::PathBuf;
use tracing::info;

/// Command-line overrides of the `benchmark` config domain
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub runs: Option<u32>,
    pub budget: Option<u64>,
    pub output: Option<PathBuf>,
    pub endpoint: Option<u32>,
    pub skip_existing: bool,
    pub catalog: Option<PathBuf>,
}

impl RunOverrides {
    /// Fold the flags into `config` and re-validate it
    pub fn apply(&self, config: &mut GenbenchConfig) -> Result<()> {
        let benchmark = &mut config.benchmark;
        if let Some(runs) = self.runs {
            benchmark.runs_per_endpoint = runs;
        }
        if let Some(budget) = self.budget {
            benchmark.search_budget_seconds = budget;
        }
        if let Some(output) = &self.output {
            benchmark.results_dir = output.clone();
        }
        if let Some(catalog) = &self.catalog {
            benchmark.catalog_path = catalog.clone();
        }
        if self.skip_existing {
            benchmark.skip_existing = true;
        }
        config
            .validate_all()
            .context("Invalid settings after applying command-line flags")
    }
}

fn load_catalog(config: &GenbenchConfig) -> Result<Catalog> {
    let path = &config.benchmark.catalog_path;
    let catalog = Catalog::load(path)
        .with_context(|| format!("Failed to load endpoint catalog {}", path.display()))?;
    info!("Loaded {} endpoint(s) from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Run the benchmark; configuration and environment problems fail before any run starts
pub async fn handle_run(mut config: GenbenchConfig, overrides: &RunOverrides) -> Result<Completion> {
    overrides.apply(&mut config)?;
    let catalog = load_catalog(&config)?;
    catalog.select(overrides.endpoint)?;

    let shutdown = ShutdownCoordinator::new();
    let _signals = shutdown.listen_for_os_signals();

    let mut options = DriverOptions::from_config(&config);
    options.only_endpoint = overrides.endpoint;

    let driver = BenchmarkDriver::new(config, catalog, shutdown);
    driver.preflight()?;

    let benchmark = driver.run(&options).await?;
    print_benchmark_summary(&benchmark, &driver.results_dir().display().to_string());

    Ok(if benchmark.interrupted {
        Completion::Interrupted
    } else {
        Completion::Done
    })
}

/// Run one (endpoint, iteration) pair in isolation
pub async fn handle_run_one(
    mut config: GenbenchConfig,
    endpoint: u32,
    run: u32,
    overrides: &RunOverrides,
) -> Result<Completion> {
    overrides.apply(&mut config)?;
    let catalog = load_catalog(&config)?;
    catalog.lookup(endpoint)?;
    let budget = config.benchmark.search_budget_seconds;

    let shutdown = ShutdownCoordinator::new();
    let _signals = shutdown.listen_for_os_signals();

    let driver = BenchmarkDriver::new(config, catalog, shutdown);
    driver.preflight()?;

    match driver.run_single(endpoint, run, budget).await? {
        RunOutcome::Recorded(record) => {
            let status = if record.runs_without_error() {
                record.generation_status.to_string().green()
            } else {
                record.generation_status.to_string().red()
            };
            println!(
                "Endpoint {} run {}: {} ({}) in {:.1}s, {} test file(s)",
                record.endpoint_id,
                record.run_number,
                status,
                record.error_type,
                record.duration_seconds,
                record.artifacts.tests_generated
            );
            if !record.error_message.is_empty() {
                println!("  {}", record.error_message);
            }
            Ok(Completion::Done)
        }
        RunOutcome::Cancelled => {
            println!("{}", "Run interrupted; partial output discarded".yellow());
            Ok(Completion::Interrupted)
        }
    }
}

fn print_benchmark_summary(benchmark: &BenchmarkRun, results_dir: &str) {
    let tally = &benchmark.tally;
    println!();
    println!("{}", format!("Benchmark {}", benchmark.id).bold());
    println!("  Recorded:   {}", tally.recorded);
    println!("  Successful: {}", tally.successful.to_string().green());
    println!("  Failed:     {}", tally.failed.to_string().red());
    println!("  Timed out:  {}", tally.timed_out);
    if tally.skipped > 0 {
        println!("  Skipped:    {}", tally.skipped);
    }
    for (label, count) in &tally.error_types {
        println!("    {}: {}", label, count);
    }
    if benchmark.interrupted {
        println!("{}", "Interrupted before completion".yellow());
    }
    println!("  Results:    {}", results_dir);
}
