//! Per-run records and their on-disk halves

use crate::error::GenbenchError;
use crate::types::{ErrorType, GenerationStatus};
use crate::MAX_ERROR_MESSAGE_CHARS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one run: (endpoint, iteration)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunKey {
    pub endpoint_id: u32,
    pub run_number: u32,
}

impl RunKey {
    pub fn new(endpoint_id: u32, run_number: u32) -> Self {
        Self {
            endpoint_id,
            run_number,
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint {} run {}", self.endpoint_id, self.run_number)
    }
}

/// Aggregated figures from the resource monitor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceSummary {
    /// Mean CPU percent over non-zero samples
    pub cpu_average_percent: f64,
    /// Peak memory observed, in MB
    pub memory_peak_mb: f64,
    pub samples: usize,
}

/// Counts derived from the generated test artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtifactCounts {
    pub tests_generated: u32,
    pub test_methods: u32,
    pub assertions: u32,
}

/// Coverage as reported by the tool; each figure may be unavailable
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageFigures {
    pub coverage: Option<f64>,
    pub total_goals: Option<u64>,
    pub covered_goals: Option<u64>,
}

impl CoverageFigures {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.coverage.is_some() || self.total_goals.is_some() || self.covered_goals.is_some()
    }
}

/// Breakdown of diagnostic lines found in the run log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorCounts {
    pub total_errors: u32,
    pub missing_packages: u32,
    pub missing_symbols: u32,
}

/// Complete record of one run. Written once at run end, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub endpoint_id: u32,
    pub run_number: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub search_budget_seconds: u64,
    pub exit_code: i32,
    pub timed_out: bool,
    pub generation_status: GenerationStatus,
    pub error_type: ErrorType,
    pub error_message: String,
    pub error_counts: ErrorCounts,
    pub resources: ResourceSummary,
    pub artifacts: ArtifactCounts,
    pub coverage: CoverageFigures,
}

impl RunRecord {
    pub fn key(&self) -> RunKey {
        RunKey::new(self.endpoint_id, self.run_number)
    }

    pub fn is_success(&self) -> bool {
        self.generation_status == GenerationStatus::Success
    }

    /// Tool finished on its own with a zero exit code
    pub fn runs_without_error(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Tool finished on its own but reported failure
    pub fn threw_errors(&self) -> bool {
        self.exit_code != 0 && !self.timed_out
    }

    /// Tool had to be killed at the deadline
    pub fn hung_up(&self) -> bool {
        self.timed_out
    }

    /// Split into the resource-metrics and exit-status halves
    pub fn to_parts(&self) -> (ResourceMetricsRecord, ExitStatusRecord) {
        let resource = ResourceMetricsRecord {
            endpoint_id: self.endpoint_id,
            run_number: self.run_number,
            start_time: self.started_at,
            end_time: self.finished_at,
            duration_seconds: self.duration_seconds,
            search_budget_seconds: self.search_budget_seconds,
            cpu_average_percent: self.resources.cpu_average_percent,
            memory_peak_mb: self.resources.memory_peak_mb,
            resource_samples: self.resources.samples,
            tests_generated: self.artifacts.tests_generated,
            test_methods: self.artifacts.test_methods,
            assertions: self.artifacts.assertions,
            coverage: self.coverage.coverage,
            total_goals: self.coverage.total_goals,
            covered_goals: self.coverage.covered_goals,
        };
        let status = ExitStatusRecord {
            endpoint_id: self.endpoint_id,
            run_number: self.run_number,
            generation_status: self.generation_status,
            exit_code: self.exit_code,
            timed_out: self.timed_out,
            runs_without_error: self.runs_without_error(),
            threw_errors: self.threw_errors(),
            hung_up: self.hung_up(),
            error_type: self.error_type,
            error_message: truncate_message(&self.error_message, MAX_ERROR_MESSAGE_CHARS),
            error_counts: self.error_counts,
        };
        (resource, status)
    }

    /// Rebuild a record from its two persisted halves
    pub fn from_parts(
        resource: ResourceMetricsRecord,
        status: ExitStatusRecord,
    ) -> Result<Self, GenbenchError> {
        if resource.endpoint_id != status.endpoint_id || resource.run_number != status.run_number {
            return Err(GenbenchError::Other(format!(
                "resource metrics for endpoint {} run {} paired with exit status for endpoint {} run {}",
                resource.endpoint_id, resource.run_number, status.endpoint_id, status.run_number
            )));
        }

        Ok(Self {
            endpoint_id: resource.endpoint_id,
            run_number: resource.run_number,
            started_at: resource.start_time,
            finished_at: resource.end_time,
            duration_seconds: resource.duration_seconds,
            search_budget_seconds: resource.search_budget_seconds,
            exit_code: status.exit_code,
            timed_out: status.timed_out,
            generation_status: status.generation_status,
            error_type: status.error_type,
            error_message: status.error_message,
            error_counts: status.error_counts,
            resources: ResourceSummary {
                cpu_average_percent: resource.cpu_average_percent,
                memory_peak_mb: resource.memory_peak_mb,
                samples: resource.resource_samples,
            },
            artifacts: ArtifactCounts {
                tests_generated: resource.tests_generated,
                test_methods: resource.test_methods,
                assertions: resource.assertions,
            },
            coverage: CoverageFigures {
                coverage: resource.coverage,
                total_goals: resource.total_goals,
                covered_goals: resource.covered_goals,
            },
        })
    }
}

/// Contents of `resource-metrics.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMetricsRecord {
    pub endpoint_id: u32,
    pub run_number: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub search_budget_seconds: u64,
    pub cpu_average_percent: f64,
    pub memory_peak_mb: f64,
    #[serde(default)]
    pub resource_samples: usize,
    pub tests_generated: u32,
    pub test_methods: u32,
    pub assertions: u32,
    #[serde(with = "not_available", default)]
    pub coverage: Option<f64>,
    #[serde(with = "not_available", default)]
    pub total_goals: Option<u64>,
    #[serde(with = "not_available", default)]
    pub covered_goals: Option<u64>,
}

/// Contents of `exit-status.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatusRecord {
    pub endpoint_id: u32,
    pub run_number: u32,
    pub generation_status: GenerationStatus,
    pub exit_code: i32,
    pub timed_out: bool,
    #[serde(default)]
    pub runs_without_error: bool,
    #[serde(default)]
    pub threw_errors: bool,
    #[serde(default)]
    pub hung_up: bool,
    pub error_type: ErrorType,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub error_counts: ErrorCounts,
}

/// Serde helper module writing `None` as the "N/A" marker
pub mod not_available {
    use crate::NOT_AVAILABLE;
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(NOT_AVAILABLE),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Field<T> {
            Value(T),
            Text(String),
        }

        match Option::<Field<T>>::deserialize(deserializer)? {
            Some(Field::Value(v)) => Ok(Some(v)),
            Some(Field::Text(text)) if text == NOT_AVAILABLE => Ok(None),
            Some(Field::Text(text)) => Err(D::Error::custom(format!(
                "expected a number or \"{}\", got \"{}\"",
                NOT_AVAILABLE, text
            ))),
            None => Ok(None),
        }
    }
}

/// Truncate free text to at most `max_chars` characters, on a char boundary
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((byte_index, _)) => message[..byte_index].to_string(),
        None => message.to_string(),
    }
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> RunRecord {
        RunRecord {
            endpoint_id: 7,
            run_number: 1,
            started_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            finished_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 1, 12).unwrap(),
            duration_seconds: 72.25,
            search_budget_seconds: 60,
            exit_code: 0,
            timed_out: false,
            generation_status: GenerationStatus::Success,
            error_type: ErrorType::None,
            error_message: String::new(),
            error_counts: ErrorCounts::default(),
            resources: ResourceSummary {
                cpu_average_percent: 41.5,
                memory_peak_mb: 812.25,
                samples: 15,
            },
            artifacts: ArtifactCounts {
                tests_generated: 4,
                test_methods: 11,
                assertions: 23,
            },
            coverage: CoverageFigures::unavailable(),
        }
    }

    #[test]
    fn test_parts_round_trip_through_json() {
        let record = sample_record();
        let (resource, status) = record.to_parts();

        let resource_json = serde_json::to_string_pretty(&resource).unwrap();
        let status_json = serde_json::to_string_pretty(&status).unwrap();
        assert!(resource_json.contains("\"coverage\": \"N/A\""));

        let resource_back: ResourceMetricsRecord = serde_json::from_str(&resource_json).unwrap();
        let status_back: ExitStatusRecord = serde_json::from_str(&status_json).unwrap();
        assert_eq!(resource_back, resource);
        assert_eq!(status_back, status);
        assert_eq!(serde_json::to_string_pretty(&resource_back).unwrap(), resource_json);

        let rebuilt = RunRecord::from_parts(resource_back, status_back).unwrap();
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn test_coverage_values_survive() {
        let mut record = sample_record();
        record.coverage = CoverageFigures {
            coverage: Some(0.8125),
            total_goals: Some(48),
            covered_goals: Some(39),
        };
        let (resource, _) = record.to_parts();
        let json = serde_json::to_string(&resource).unwrap();
        let back: ResourceMetricsRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.coverage, Some(0.8125));
        assert_eq!(back.total_goals, Some(48));
    }

    #[test]
    fn test_not_available_rejects_other_text() {
        let json = r#"{"endpoint_id":1,"run_number":1,"start_time":"2026-03-01T10:00:00Z","end_time":"2026-03-01T10:00:00Z","duration_seconds":1.0,"search_budget_seconds":60,"cpu_average_percent":0.0,"memory_peak_mb":0.0,"tests_generated":0,"test_methods":0,"assertions":0,"coverage":"lots"}"#;
        assert!(serde_json::from_str::<ResourceMetricsRecord>(json).is_err());
    }

    #[test]
    fn test_error_message_truncated_in_status() {
        let mut record = sample_record();
        record.exit_code = 1;
        record.error_message = "é".repeat(600);
        let (_, status) = record.to_parts();
        assert_eq!(status.error_message.chars().count(), MAX_ERROR_MESSAGE_CHARS);
        assert!(status.threw_errors);
        assert!(!status.runs_without_error);
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let (resource, mut status) = sample_record().to_parts();
        status.run_number = 2;
        assert!(RunRecord::from_parts(resource, status).is_err());
    }

    #[test]
    fn test_truncate_and_round() {
        assert_eq!(truncate_message("abcdef", 3), "abc");
        assert_eq!(truncate_message("abc", 10), "abc");
        assert_eq!(round_to(1.234567, 4), 1.2346);
    }
}
