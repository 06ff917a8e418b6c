//! Benchmark-wide summary: `metrics-summary.json` and `summary-report.md`

use crate::aggregate::EndpointAggregate;
use crate::stats::{Stats, STAT_PRECISION};
use genbench_core::record::round_to;
use genbench_core::{Catalog, ErrorType, RunRecord, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Global counts and averages over every recorded run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub total_endpoints: usize,
    pub total_runs: usize,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub timed_out_runs: usize,
    pub success_rate: Option<f64>,

    pub generation_time: Stats,
    pub cpu_usage: Stats,
    pub memory_usage: Stats,
    pub tests_generated: Stats,
    pub assertions: Stats,
    pub coverage: Stats,

    /// Failure labels over all runs, in taxonomy order
    pub error_distribution: BTreeMap<ErrorType, usize>,
    /// Endpoint id to the run numbers it is missing
    pub missing_runs: BTreeMap<u32, Vec<u32>>,
    /// Endpoints where no recorded run succeeded
    pub all_failed_endpoints: Vec<u32>,
}

impl BenchmarkSummary {
    pub fn from_aggregates(aggregates: &[EndpointAggregate], records: &[RunRecord]) -> Self {
        let total_runs = records.len();
        let successful_runs = records.iter().filter(|r| r.runs_without_error()).count();

        let mut error_distribution = BTreeMap::new();
        for record in records.iter().filter(|r| r.error_type.is_failure()) {
            *error_distribution.entry(record.error_type).or_default() += 1;
        }

        let sampled = || records.iter().filter(|r| r.resources.samples > 0);

        Self {
            total_endpoints: aggregates.len(),
            total_runs,
            successful_runs,
            failed_runs: total_runs - successful_runs,
            timed_out_runs: records.iter().filter(|r| r.timed_out).count(),
            success_rate: (total_runs > 0).then(|| {
                round_to(successful_runs as f64 / total_runs as f64, STAT_PRECISION)
            }),
            generation_time: Stats::of(records.iter().map(|r| r.duration_seconds)),
            cpu_usage: Stats::of(sampled().map(|r| r.resources.cpu_average_percent)),
            memory_usage: Stats::of(sampled().map(|r| r.resources.memory_peak_mb)),
            tests_generated: Stats::of(records.iter().map(|r| r.artifacts.tests_generated as f64)),
            assertions: Stats::of(records.iter().map(|r| r.artifacts.assertions as f64)),
            coverage: Stats::of_available(records.iter().map(|r| r.coverage.coverage)),
            error_distribution,
            missing_runs: aggregates
                .iter()
                .filter(|a| !a.missing_runs.is_empty())
                .map(|a| (a.endpoint_id, a.missing_runs.clone()))
                .collect(),
            all_failed_endpoints: aggregates
                .iter()
                .filter(|a| a.all_failed())
                .map(|a| a.endpoint_id)
                .collect(),
        }
    }
}

fn percent(rate: Option<f64>) -> String {
    rate.map(|r| format!("{:.1}%", r * 100.0))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn number(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{:.*}", decimals, v))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Render `summary-report.md`
pub fn render_markdown(
    summary: &BenchmarkSummary,
    aggregates: &[EndpointAggregate],
    catalog: Option<&Catalog>,
    caveats: &[String],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Benchmark Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Totals");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| Endpoints | {} |", summary.total_endpoints);
    let _ = writeln!(out, "| Runs recorded | {} |", summary.total_runs);
    let _ = writeln!(out, "| Successful runs | {} |", summary.successful_runs);
    let _ = writeln!(out, "| Failed runs | {} |", summary.failed_runs);
    let _ = writeln!(out, "| Timed out | {} |", summary.timed_out_runs);
    let _ = writeln!(out, "| Success rate | {} |", percent(summary.success_rate));
    let _ = writeln!(
        out,
        "| Avg generation time (s) | {} |",
        number(summary.generation_time.avg, 1)
    );
    let _ = writeln!(out, "| Avg CPU (%) | {} |", number(summary.cpu_usage.avg, 1));
    let _ = writeln!(out, "| Avg peak memory (MB) | {} |", number(summary.memory_usage.avg, 0));
    let _ = writeln!(out, "| Avg tests generated | {} |", number(summary.tests_generated.avg, 2));
    let _ = writeln!(out, "| Avg coverage | {} |", number(summary.coverage.avg, 4));
    let _ = writeln!(out);

    let _ = writeln!(out, "## Endpoints");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "| ID | Service | Method | Path | Runs | Success | Avg time (s) | Avg tests | Primary error |"
    );
    let _ = writeln!(out, "|---|---|---|---|---|---|---|---|---|");
    for aggregate in aggregates {
        let endpoint = catalog.and_then(|c| c.lookup(aggregate.endpoint_id).ok());
        let (service, method, path) = match endpoint {
            Some(e) => (e.service.clone(), e.http_method.to_string(), e.path.clone()),
            None => (
                NOT_AVAILABLE.to_string(),
                NOT_AVAILABLE.to_string(),
                NOT_AVAILABLE.to_string(),
            ),
        };
        let _ = writeln!(
            out,
            "| {} | {} | {} | `{}` | {} | {} | {} | {} | {} |",
            aggregate.endpoint_id,
            service,
            method,
            path,
            aggregate.total_runs,
            percent(aggregate.success_rate),
            number(aggregate.generation_time.avg, 1),
            number(aggregate.tests_generated.avg, 2),
            aggregate.error_summary.primary_error_type
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Error Distribution");
    let _ = writeln!(out);
    if summary.error_distribution.is_empty() {
        let _ = writeln!(out, "No failed runs.");
    } else {
        let _ = writeln!(out, "| Error type | Runs | Meaning |");
        let _ = writeln!(out, "|---|---|---|");
        for (label, count) in &summary.error_distribution {
            let _ = writeln!(out, "| {} | {} | {} |", label, count, label.description());
        }
    }
    let _ = writeln!(out);

    if !summary.missing_runs.is_empty() {
        let _ = writeln!(out, "## Missing Runs");
        let _ = writeln!(out);
        for (endpoint_id, runs) in &summary.missing_runs {
            let runs: Vec<String> = runs.iter().map(u32::to_string).collect();
            let _ = writeln!(out, "- Endpoint {}: run(s) {}", endpoint_id, runs.join(", "));
        }
        let _ = writeln!(out);
    }

    if !caveats.is_empty() || !summary.all_failed_endpoints.is_empty() {
        let _ = writeln!(out, "## Caveats");
        let _ = writeln!(out);
        for caveat in caveats {
            let _ = writeln!(out, "- {}", caveat);
        }
        if !summary.all_failed_endpoints.is_empty() {
            let ids: Vec<String> = summary
                .all_failed_endpoints
                .iter()
                .map(u32::to_string)
                .collect();
            let _ = writeln!(
                out,
                "- No run succeeded for endpoint(s) {}. Listed for context; see the error distribution above.",
                ids.join(", ")
            );
        }
        let _ = writeln!(out);
    }

    out
}
