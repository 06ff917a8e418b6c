//! Tabular outputs: `benchmark-results.csv` and `detailed-metrics.csv`

use crate::error::ReportResult;
use genbench_core::record::truncate_message;
use genbench_core::{Catalog, RunRecord, NOT_AVAILABLE};
use serde_json::Value;

/// Error messages in the results table are cut to this many characters
pub const TABLE_MESSAGE_CHARS: usize = 200;

/// Columns of `benchmark-results.csv`, in order
pub const RESULT_COLUMNS: &[&str] = &[
    // Identification
    "endpoint_id",
    "service",
    "http_method",
    "endpoint_path",
    "controller_class",
    "run_number",
    // Generation results
    "generation_status",
    "generation_time_sec",
    "generation_cpu_pct",
    "generation_memory_mb",
    // Test metrics
    "tests_generated",
    "test_methods_count",
    "assertions_count",
    // Coverage
    "line_coverage",
    "branch_coverage",
    "total_goals",
    "covered_goals",
    // Error information
    "exit_code",
    "error_type",
    "error_message",
    // Semantic validity (manual)
    "targets_correct_endpoint",
    "asserts_http_status",
    "correct_comparator",
    "inline_with_scenarios",
    "missing_url_params",
    "missing_request_body",
    // Semantic quality (manual)
    "assertions_meaningful",
    "boundary_conditions",
    "verifies_authorization",
    "invalid_url_params",
    "invalid_request_body",
    // Runtime validity
    "runs_without_error",
    "threw_errors",
    "runtime_anomalies",
    "timed_out",
    "hung_up",
    // Runtime quality (requires executing the generated tests)
    "test_flakiness_rate",
    "test_exec_memory_mb",
    "test_exec_cpu_sec",
    // Performance quality (requires executing the generated tests)
    "mean_test_exec_time_ms",
    "exec_time_std_dev_ms",
    // Metadata
    "manual_evaluation_complete",
    "evaluator_notes",
];

/// Columns a qualitative overlay may write
pub const QUALITATIVE_COLUMNS: &[&str] = &[
    "targets_correct_endpoint",
    "asserts_http_status",
    "correct_comparator",
    "inline_with_scenarios",
    "missing_url_params",
    "missing_request_body",
    "assertions_meaningful",
    "boundary_conditions",
    "verifies_authorization",
    "invalid_url_params",
    "invalid_request_body",
];

pub const MANUAL_COMPLETE_COLUMN: &str = "manual_evaluation_complete";

fn flag(value: bool) -> String {
    if value { "TRUE" } else { "FALSE" }.to_string()
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// One row of the results table, in [`RESULT_COLUMNS`] order
pub fn result_row(record: &RunRecord, catalog: Option<&Catalog>) -> Vec<String> {
    let endpoint = catalog.and_then(|c| c.lookup(record.endpoint_id).ok());
    let identity = |f: &dyn Fn(&genbench_core::EndpointDescriptor) -> String| {
        endpoint.map(f).unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    let sampled = record.resources.samples > 0;

    let mut row = vec![
        record.endpoint_id.to_string(),
        identity(&|e| e.service.clone()),
        identity(&|e| e.http_method.to_string()),
        identity(&|e| e.path.clone()),
        identity(&|e| e.controller_class.clone()),
        record.run_number.to_string(),
        record.generation_status.to_string(),
        record.duration_seconds.to_string(),
        opt(sampled.then_some(record.resources.cpu_average_percent)),
        opt(sampled.then_some(record.resources.memory_peak_mb)),
        record.artifacts.tests_generated.to_string(),
        record.artifacts.test_methods.to_string(),
        record.artifacts.assertions.to_string(),
        opt(record.coverage.coverage),
        NOT_AVAILABLE.to_string(),
        opt(record.coverage.total_goals),
        opt(record.coverage.covered_goals),
        record.exit_code.to_string(),
        record.error_type.to_string(),
        truncate_message(&record.error_message, TABLE_MESSAGE_CHARS),
    ];
    row.extend(QUALITATIVE_COLUMNS.iter().map(|_| NOT_AVAILABLE.to_string()));
    row.extend([
        flag(record.runs_without_error()),
        flag(record.threw_errors()),
        if record.threw_errors() {
            record.error_type.to_string()
        } else {
            String::new()
        },
        flag(record.timed_out),
        flag(record.hung_up()),
    ]);
    row.extend((0..5).map(|_| NOT_AVAILABLE.to_string()));
    row.extend([flag(false), String::new()]);
    row
}

/// Render the results table
pub fn results_csv(records: &[RunRecord], catalog: Option<&Catalog>) -> ReportResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(RESULT_COLUMNS)?;
    for record in records {
        writer.write_record(result_row(record, catalog))?;
    }
    Ok(writer.into_inner()?)
}

const DETAILED_COLUMNS: &[&str] = &[
    "endpoint_id",
    "run_number",
    "source_file",
    "metric_name",
    "metric_value",
    "metric_type",
];

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render the long-form dump of every persisted field of every record
pub fn detailed_csv(records: &[RunRecord]) -> ReportResult<Vec<u8>> {
    use genbench_core::layout::{EXIT_STATUS_FILE, RESOURCE_METRICS_FILE};

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(DETAILED_COLUMNS)?;

    for record in records {
        let (resource, status) = record.to_parts();
        let halves = [
            (RESOURCE_METRICS_FILE, serde_json::to_value(&resource)?),
            (EXIT_STATUS_FILE, serde_json::to_value(&status)?),
        ];
        for (source_file, value) in halves {
            let Value::Object(fields) = value else {
                continue;
            };
            for (name, value) in fields {
                writer.write_record([
                    record.endpoint_id.to_string(),
                    record.run_number.to_string(),
                    source_file.to_string(),
                    name,
                    value_text(&value),
                    value_type(&value).to_string(),
                ])?;
            }
        }
    }
    Ok(writer.into_inner()?)
}
