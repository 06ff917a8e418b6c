//! Endpoint Aggregator
//!
//! A pure fold over the records of one endpoint. The output carries no
//! wall-clock data, so aggregating the same records twice produces identical
//! JSON and text.

use crate::stats::{Stats, STAT_PRECISION};
use genbench_core::record::{round_to, truncate_message};
use genbench_core::{ErrorType, RunRecord, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

/// Distinct error messages kept per endpoint
pub const MAX_UNIQUE_MESSAGES: usize = 5;

const RUN_TABLE_MESSAGE_CHARS: usize = 200;

/// Contents of `run-averages.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointAggregate {
    pub endpoint_id: u32,
    pub total_runs: usize,
    pub expected_runs: Option<u32>,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub success_rate: Option<f64>,
    pub timed_out_count: usize,
    pub hung_up_count: usize,
    /// Expected run numbers with no record
    pub missing_runs: Vec<u32>,

    pub generation_time: Stats,
    pub cpu_usage: Stats,
    pub memory_usage: Stats,
    pub tests_generated: Stats,
    pub test_methods: Stats,
    pub assertions: Stats,
    pub coverage: Stats,
    pub total_goals: Stats,
    pub covered_goals: Stats,

    pub exit_codes: ExitCodeSummary,
    pub error_summary: ErrorSummary,
    pub individual_runs: Vec<RunSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCodeSummary {
    pub values: Vec<i32>,
    pub unique: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// Most frequent failure label; ties go to the earlier label in the cascade
    pub primary_error_type: ErrorType,
    /// Failure labels only, in taxonomy order
    pub error_types: BTreeMap<ErrorType, usize>,
    pub total_errors: Stats,
    pub missing_packages: Stats,
    pub missing_symbols: Stats,
    pub unique_error_messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_number: u32,
    pub duration_sec: f64,
    pub cpu_pct: Option<f64>,
    pub memory_mb: Option<f64>,
    pub tests: u32,
    pub exit_code: i32,
    pub timed_out: bool,
    pub error_type: ErrorType,
    pub error_message: String,
}

/// CPU and memory figures of a run, when its monitor took any samples
fn resource_figures(record: &RunRecord) -> (Option<f64>, Option<f64>) {
    if record.resources.samples == 0 {
        (None, None)
    } else {
        (
            Some(record.resources.cpu_average_percent),
            Some(record.resources.memory_peak_mb),
        )
    }
}

/// Fold the records of one endpoint.
///
/// `expected_runs`, when known, is the planned iteration count; run numbers
/// in `1..=expected_runs` without a record are reported as missing. Records
/// of other endpoints are ignored.
pub fn aggregate(
    endpoint_id: u32,
    expected_runs: Option<u32>,
    records: &[RunRecord],
) -> EndpointAggregate {
    let mut records: Vec<&RunRecord> = records
        .iter()
        .filter(|r| r.endpoint_id == endpoint_id)
        .collect();
    records.sort_by_key(|r| r.run_number);
    records.dedup_by_key(|r| r.run_number);

    let present: BTreeSet<u32> = records.iter().map(|r| r.run_number).collect();
    let missing_runs = match expected_runs {
        Some(expected) => (1..=expected).filter(|n| !present.contains(n)).collect(),
        None => Vec::new(),
    };

    let successful_runs = records.iter().filter(|r| r.runs_without_error()).count();
    let total_runs = records.len();
    let success_rate = if total_runs == 0 {
        None
    } else {
        Some(round_to(successful_runs as f64 / total_runs as f64, STAT_PRECISION))
    };

    let mut error_types: BTreeMap<ErrorType, usize> = BTreeMap::new();
    for record in &records {
        if record.error_type.is_failure() {
            *error_types.entry(record.error_type).or_default() += 1;
        }
    }
    let primary_error_type = error_types
        .iter()
        .fold(None, |best: Option<(ErrorType, usize)>, (label, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((*label, *count)),
        })
        .map(|(label, _)| label)
        .unwrap_or(ErrorType::None);

    let mut unique_error_messages: Vec<String> = Vec::new();
    for record in &records {
        let message = record.error_message.trim();
        if message.is_empty() || unique_error_messages.iter().any(|m| m == message) {
            continue;
        }
        if unique_error_messages.len() == MAX_UNIQUE_MESSAGES {
            break;
        }
        unique_error_messages.push(message.to_string());
    }

    let exit_values: Vec<i32> = records.iter().map(|r| r.exit_code).collect();
    let unique: BTreeSet<i32> = exit_values.iter().copied().collect();

    let failed: Vec<&&RunRecord> = records.iter().filter(|r| r.threw_errors() || r.timed_out).collect();

    EndpointAggregate {
        endpoint_id,
        total_runs,
        expected_runs,
        successful_runs,
        failed_runs: total_runs - successful_runs,
        success_rate,
        timed_out_count: records.iter().filter(|r| r.timed_out).count(),
        hung_up_count: records.iter().filter(|r| r.hung_up()).count(),
        missing_runs,

        generation_time: Stats::of(records.iter().map(|r| r.duration_seconds)),
        cpu_usage: Stats::of_available(records.iter().map(|r| resource_figures(r).0)),
        memory_usage: Stats::of_available(records.iter().map(|r| resource_figures(r).1)),
        tests_generated: Stats::of(records.iter().map(|r| r.artifacts.tests_generated as f64)),
        test_methods: Stats::of(records.iter().map(|r| r.artifacts.test_methods as f64)),
        assertions: Stats::of(records.iter().map(|r| r.artifacts.assertions as f64)),
        coverage: Stats::of_available(records.iter().map(|r| r.coverage.coverage)),
        total_goals: Stats::of_available(
            records.iter().map(|r| r.coverage.total_goals.map(|v| v as f64)),
        ),
        covered_goals: Stats::of_available(
            records.iter().map(|r| r.coverage.covered_goals.map(|v| v as f64)),
        ),

        exit_codes: ExitCodeSummary {
            values: exit_values,
            unique: unique.into_iter().collect(),
        },
        error_summary: ErrorSummary {
            primary_error_type,
            error_types,
            total_errors: Stats::of(failed.iter().map(|r| r.error_counts.total_errors as f64)),
            missing_packages: Stats::of(
                failed.iter().map(|r| r.error_counts.missing_packages as f64),
            ),
            missing_symbols: Stats::of(failed.iter().map(|r| r.error_counts.missing_symbols as f64)),
            unique_error_messages,
        },
        individual_runs: records
            .iter()
            .map(|r| {
                let (cpu_pct, memory_mb) = resource_figures(r);
                RunSummary {
                    run_number: r.run_number,
                    duration_sec: r.duration_seconds,
                    cpu_pct,
                    memory_mb,
                    tests: r.artifacts.tests_generated,
                    exit_code: r.exit_code,
                    timed_out: r.timed_out,
                    error_type: r.error_type,
                    error_message: truncate_message(&r.error_message, RUN_TABLE_MESSAGE_CHARS),
                }
            })
            .collect(),
    }
}

impl EndpointAggregate {
    /// At least one run was recorded and none succeeded
    pub fn all_failed(&self) -> bool {
        self.total_runs > 0 && self.successful_runs == 0
    }

    /// Render `run-averages.txt`
    pub fn render_text(&self) -> String {
        let rule = "=".repeat(60);
        let thin = "-".repeat(40);
        let mut out = String::new();

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "ENDPOINT {} - AGGREGATED RESULTS", self.endpoint_id);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out);
        let _ = writeln!(out, "EXECUTION SUMMARY");
        let _ = writeln!(out, "{}", thin);
        let _ = writeln!(out, "Total Runs:      {}", self.total_runs);
        if let Some(expected) = self.expected_runs {
            let _ = writeln!(out, "Expected Runs:   {}", expected);
        }
        let _ = writeln!(out, "Successful:      {}", self.successful_runs);
        let _ = writeln!(out, "Failed:          {}", self.failed_runs);
        let _ = writeln!(
            out,
            "Success Rate:    {}",
            self.success_rate
                .map(|rate| format!("{:.1}%", rate * 100.0))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        );
        let _ = writeln!(out, "Timed Out:       {}", self.timed_out_count);
        let _ = writeln!(out, "Hung Up:         {}", self.hung_up_count);
        if !self.missing_runs.is_empty() {
            let missing: Vec<String> = self.missing_runs.iter().map(u32::to_string).collect();
            let _ = writeln!(out, "Missing Runs:    {}", missing.join(", "));
        }
        let _ = writeln!(out);

        let errors = &self.error_summary;
        if !errors.error_types.is_empty() {
            let _ = writeln!(out, "ERROR SUMMARY");
            let _ = writeln!(out, "{}", thin);
            let _ = writeln!(out, "Primary Error:   {}", errors.primary_error_type);
            let _ = writeln!(out, "Error Types:");
            for (label, count) in &errors.error_types {
                let _ = writeln!(out, "  - {}: {}", label, count);
            }
            if let Some(avg) = errors.total_errors.avg {
                let _ = writeln!(out, "Avg Errors per Failed Run: {}", avg);
            }
            if !errors.unique_error_messages.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "Sample Error Messages:");
                for message in errors.unique_error_messages.iter().take(3) {
                    let shown = truncate_message(message, 100);
                    let ellipsis = if shown.len() < message.len() { "..." } else { "" };
                    let _ = writeln!(out, "  * {}{}", shown, ellipsis);
                }
            }
            let _ = writeln!(out);
        }

        write_stats_block(&mut out, "GENERATION TIME (seconds)", &self.generation_time);
        write_stats_block(&mut out, "CPU USAGE (%)", &self.cpu_usage);
        write_stats_block(&mut out, "MEMORY USAGE (MB)", &self.memory_usage);
        write_stats_block(&mut out, "COVERAGE", &self.coverage);

        let total_tests: u32 = self.individual_runs.iter().map(|r| r.tests).sum();
        let _ = writeln!(out, "TESTS GENERATED");
        let _ = writeln!(out, "{}", thin);
        let _ = writeln!(out, "Average:         {}", fmt_opt(self.tests_generated.avg));
        let _ = writeln!(out, "Total:           {}", total_tests);
        let _ = writeln!(out);

        let _ = writeln!(out, "INDIVIDUAL RUNS");
        let _ = writeln!(out, "{}", thin);
        let _ = writeln!(
            out,
            "{:<6} {:<10} {:<10} {:<10} {:<8} {:<6} Error",
            "Run", "Time(s)", "CPU(%)", "Mem(MB)", "Tests", "Exit"
        );
        let _ = writeln!(out, "{}", "-".repeat(70));
        for run in &self.individual_runs {
            let cpu = run
                .cpu_pct
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let mem = run
                .memory_mb
                .map(|v| format!("{:.0}", v))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let _ = writeln!(
                out,
                "{:<6} {:<10} {:<10} {:<10} {:<8} {:<6} {}",
                run.run_number,
                format!("{:.1}", run.duration_sec),
                cpu,
                mem,
                run.tests,
                run.exit_code,
                run.error_type
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule);
        out
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn write_stats_block(out: &mut String, title: &str, stats: &Stats) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(40));
    let _ = writeln!(out, "Average:         {}", fmt_opt(stats.avg));
    let _ = writeln!(out, "Min:             {}", fmt_opt(stats.min));
    let _ = writeln!(out, "Max:             {}", fmt_opt(stats.max));
    let _ = writeln!(out, "Std Dev:         {}", fmt_opt(stats.std_dev));
    let _ = writeln!(out);
}
