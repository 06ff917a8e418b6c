//! `genbench report` and `genbench collect`

use super::Completion;
use anyhow::{Context, Result};
use colored::Colorize;
use genbench_config::GenbenchConfig;
use genbench_core::{Catalog, NOT_AVAILABLE};
use genbench_report::{CollectedResults, ReportGenerator, ResultsCollector};
use genbench_storage::FilesystemRepository;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

async fn collect(root: PathBuf) -> Result<CollectedResults> {
    let repository = Arc::new(FilesystemRepository::new(root));
    ResultsCollector::new(repository)
        .collect()
        .await
        .context("Failed to collect results")
}

/// Identification columns stay `N/A` when the catalog cannot be read
fn optional_catalog(config: &GenbenchConfig) -> Option<Catalog> {
    match Catalog::load(&config.benchmark.catalog_path) {
        Ok(catalog) => Some(catalog),
        Err(e) => {
            warn!("Reporting without endpoint details: {}", e);
            None
        }
    }
}

/// Regenerate every report from an existing results tree
pub async fn handle_report(
    config: &GenbenchConfig,
    results: Option<PathBuf>,
    merge_manual: bool,
) -> Result<Completion> {
    let root = results.unwrap_or_else(|| config.benchmark.results_dir.clone());
    let collected = collect(root.clone()).await?;

    let generator = ReportGenerator::new(config.report.clone(), optional_catalog(config));
    let outputs = generator.generate(&collected).await?;

    println!(
        "{} Reports for {} run(s) across {} endpoint(s)",
        "✓".green(),
        collected.record_count(),
        collected.endpoints.len()
    );
    println!("  {}", outputs.results_csv.display());
    if let Some(detailed) = &outputs.detailed_csv {
        println!("  {}", detailed.display());
    }
    println!("  {}", outputs.summary_report.display());
    println!("  {}", outputs.metrics_summary.display());

    if merge_manual {
        let updated = generator.merge_manual(&root).await?;
        println!("{} Manual evaluations merged into {} row(s)", "✓".green(), updated);
    }

    Ok(Completion::Done)
}

/// Aggregate each endpoint and write `metrics-summary.json`
pub async fn handle_collect(config: &GenbenchConfig, results: Option<PathBuf>) -> Result<Completion> {
    let root = results.unwrap_or_else(|| config.benchmark.results_dir.clone());
    let collected = collect(root).await?;

    let generator = ReportGenerator::new(config.report.clone(), None);
    let (aggregates, summary, outputs) = generator.write_metrics(&collected).await?;

    println!(
        "{:<10} {:>6} {:>9} {:>12} {:<24}",
        "Endpoint", "Runs", "Success", "Avg time(s)", "Primary error"
    );
    for aggregate in &aggregates {
        let rate = aggregate
            .success_rate
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let time = aggregate
            .generation_time
            .avg
            .map(|t| format!("{:.1}", t))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        println!(
            "{:<10} {:>6} {:>9} {:>12} {:<24}",
            aggregate.endpoint_id,
            aggregate.total_runs,
            rate,
            time,
            aggregate.error_summary.primary_error_type.as_str()
        );
    }
    println!(
        "{} {} run(s), {} successful; summary at {}",
        "✓".green(),
        summary.total_runs,
        summary.successful_runs,
        outputs.metrics_summary.display()
    );

    Ok(Completion::Done)
}
