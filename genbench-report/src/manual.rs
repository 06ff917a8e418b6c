//! Manual evaluation checklists merged into the results table

use crate::dataset::{MANUAL_COMPLETE_COLUMN, QUALITATIVE_COLUMNS};
use crate::error::{ReportError, ReportResult};
use genbench_core::layout::{parse_numbered_dir, MANUAL_EVALUATION_FILE};
use genbench_storage::write_atomic;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Checklist prompt text and the column its answer lands in
const CHECKLIST_ITEMS: &[(&str, &str)] = &[
    ("Targets the correct endpoint", "targets_correct_endpoint"),
    ("Asserts the expected HTTP status", "asserts_http_status"),
    ("Uses the correct comparator", "correct_comparator"),
    ("Inline with the endpoint scenarios", "inline_with_scenarios"),
    ("Missing URL parameter", "missing_url_params"),
    ("Missing request body", "missing_request_body"),
    ("assertions specific and meaningful", "assertions_meaningful"),
    ("Boundary conditions", "boundary_conditions"),
    ("Verifies authorization", "verifies_authorization"),
    ("Invalid URL parameter", "invalid_url_params"),
    ("Invalid request body", "invalid_request_body"),
];

/// Answers needed before an evaluation counts as complete
pub const COMPLETE_THRESHOLD: usize = 5;

static PROMPTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CHECKLIST_ITEMS
        .iter()
        .map(|(prompt, column)| {
            let pattern = format!("(?i){}", regex::escape(prompt));
            (Regex::new(&pattern).expect("escaped prompt regex"), *column)
        })
        .collect()
});

static CHECKED_OPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[xX]\]\s*(Yes|Partial|No|N/A)\b").expect("checked option regex")
});

/// Answers parsed from one `manual-evaluation.md`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualEvaluation {
    /// Column name to answer, for the items that have a ticked box
    pub answers: BTreeMap<&'static str, String>,
}

impl ManualEvaluation {
    pub fn parse(content: &str) -> Self {
        let mut answers = BTreeMap::new();

        for (prompt, column) in PROMPTS.iter() {
            let Some(found) = prompt.find(content) else {
                continue;
            };
            let section = &content[found.start()..];
            let section = match section.find("###") {
                Some(end) => &section[..end],
                None => section,
            };
            if let Some(caps) = CHECKED_OPTION.captures(section) {
                answers.insert(*column, caps[1].to_string());
            }
        }

        Self { answers }
    }

    pub fn is_complete(&self) -> bool {
        self.answers
            .values()
            .filter(|v| !matches!(v.as_str(), "" | "N/A" | "FALSE"))
            .count()
            >= COMPLETE_THRESHOLD
    }

    /// Column updates for rows of the evaluated endpoint
    pub fn column_values(&self) -> Vec<(&'static str, String)> {
        let mut values: Vec<(&'static str, String)> = self
            .answers
            .iter()
            .map(|(column, answer)| (*column, answer.clone()))
            .collect();
        let complete = if self.is_complete() { "TRUE" } else { "FALSE" };
        values.push((MANUAL_COMPLETE_COLUMN, complete.to_string()));
        values
    }
}

/// Read every `endpoint_NN/manual-evaluation.md` under `results_root`
pub fn collect_evaluations(results_root: &Path) -> ReportResult<BTreeMap<u32, ManualEvaluation>> {
    let mut evaluations = BTreeMap::new();
    for entry in std::fs::read_dir(results_root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(endpoint_id) = name.to_str().and_then(|n| parse_numbered_dir(n, "endpoint"))
        else {
            continue;
        };
        let path = entry.path().join(MANUAL_EVALUATION_FILE);
        if !path.is_file() {
            continue;
        }
        let evaluation = ManualEvaluation::parse(&std::fs::read_to_string(&path)?);
        debug!(
            endpoint_id,
            answers = evaluation.answers.len(),
            "Parsed {}",
            path.display()
        );
        evaluations.insert(endpoint_id, evaluation);
    }
    Ok(evaluations)
}

/// Overlay checklist answers onto an existing results table.
///
/// Only the qualitative columns and `manual_evaluation_complete` are touched.
/// Returns the number of rows updated.
pub async fn merge_manual_evaluations(results_root: &Path, table: &Path) -> ReportResult<usize> {
    if !table.is_file() {
        return Err(ReportError::MissingTable(table.to_path_buf()));
    }

    let evaluations = collect_evaluations(results_root)?;

    let mut reader = csv::Reader::from_path(table)?;
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let id_at = column("endpoint_id").ok_or_else(|| ReportError::MissingColumn {
        path: table.to_path_buf(),
        column: "endpoint_id".to_string(),
    })?;

    let mut rows = Vec::new();
    let mut updated = 0;
    for row in reader.records() {
        let mut fields: Vec<String> = row?.iter().map(str::to_string).collect();
        let endpoint_id = fields.get(id_at).and_then(|v| v.trim().parse::<u32>().ok());
        if let Some(evaluation) = endpoint_id.and_then(|id| evaluations.get(&id)) {
            for (name, value) in evaluation.column_values() {
                if name != MANUAL_COMPLETE_COLUMN && !QUALITATIVE_COLUMNS.contains(&name) {
                    continue;
                }
                if let Some(field) = column(name).and_then(|at| fields.get_mut(at)) {
                    *field = value;
                }
            }
            updated += 1;
        }
        rows.push(fields);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    write_atomic(table, &writer.into_inner()?).await?;

    info!(
        "Merged {} manual evaluation(s) into {} row(s) of {}",
        evaluations.len(),
        updated,
        table.display()
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CHECKLIST: &str = "\
# Manual Evaluation: Endpoint 7

### 1. Targets the correct endpoint
- [x] Yes
- [ ] Partial
- [ ] No

### 2. Asserts the expected HTTP status
- [ ] Yes
- [X] Partial
- [ ] No

### 3. Uses the correct comparator
- [ ] Yes
- [ ] No

### 4. Are assertions specific and meaningful?
- [ ] Yes
- [x] No

### 5. Boundary conditions tested
- [x] Yes

### 6. Verifies authorization
- [x] N/A
";

    #[test]
    fn test_parse_checked_answers() {
        let evaluation = ManualEvaluation::parse(CHECKLIST);
        assert_eq!(evaluation.answers["targets_correct_endpoint"], "Yes");
        assert_eq!(evaluation.answers["asserts_http_status"], "Partial");
        assert!(!evaluation.answers.contains_key("correct_comparator"));
        assert_eq!(evaluation.answers["assertions_meaningful"], "No");
        assert_eq!(evaluation.answers["boundary_conditions"], "Yes");
        assert_eq!(evaluation.answers["verifies_authorization"], "N/A");
        // Yes, Partial, No, Yes answered; N/A does not count
        assert!(!evaluation.is_complete());
    }

    #[test]
    fn test_section_ends_at_next_heading() {
        let content = "### Missing URL parameter\n- [ ] Yes\n### Other\n- [x] Yes\n";
        let evaluation = ManualEvaluation::parse(content);
        assert!(evaluation.answers.is_empty());
    }

    #[test]
    fn test_complete_with_five_answers() {
        let content = CHECKLIST.replace("- [ ] Yes\n- [ ] No", "- [x] Yes\n- [ ] No");
        let evaluation = ManualEvaluation::parse(&content);
        assert_eq!(evaluation.answers["correct_comparator"], "Yes");
        assert!(evaluation.is_complete());
        assert!(evaluation
            .column_values()
            .contains(&(MANUAL_COMPLETE_COLUMN, "TRUE".to_string())));
    }

    #[tokio::test]
    async fn test_merge_touches_only_qualitative_columns() {
        let temp = TempDir::new().unwrap();
        let table = temp.path().join("benchmark-results.csv");
        std::fs::write(
            &table,
            "endpoint_id,run_number,exit_code,targets_correct_endpoint,asserts_http_status,manual_evaluation_complete,evaluator_notes\n\
             7,1,0,N/A,N/A,FALSE,kept\n\
             8,1,1,N/A,N/A,FALSE,\n",
        )
        .unwrap();
        std::fs::create_dir_all(temp.path().join("endpoint_07")).unwrap();
        std::fs::write(
            temp.path().join("endpoint_07").join(MANUAL_EVALUATION_FILE),
            CHECKLIST,
        )
        .unwrap();

        let updated = merge_manual_evaluations(temp.path(), &table).await.unwrap();
        assert_eq!(updated, 1);

        let text = std::fs::read_to_string(&table).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "7,1,0,Yes,Partial,FALSE,kept");
        assert_eq!(lines[2], "8,1,1,N/A,N/A,FALSE,");
    }

    #[tokio::test]
    async fn test_merge_requires_existing_table() {
        let temp = TempDir::new().unwrap();
        let err = merge_manual_evaluations(temp.path(), &temp.path().join("missing.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingTable(_)));
    }
}
