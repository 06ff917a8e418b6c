//! Static analysis of generated tests and run logs

use crate::error::StorageResult;
use genbench_core::ArtifactCounts;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Suffix the tool gives its generated test classes
pub const TEST_FILE_SUFFIX: &str = "_ESTest.java";

/// Assertion-like calls counted in generated tests, in report order
pub const ASSERTION_KINDS: &[&str] = &[
    "assertEquals",
    "assertNotNull",
    "assertNull",
    "assertTrue",
    "assertFalse",
    "assertThat",
    "fail",
    "verifyException",
];

static ASSERTION_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ASSERTION_KINDS
        .iter()
        .map(|kind| {
            let re = Regex::new(&format!(r"\b{}\s*\(", kind)).expect("valid regex");
            (*kind, re)
        })
        .collect()
});

static TEST_ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@Test\b").expect("valid regex"));

static BOUNDARY_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\(\s*(null|""|0|-1|0\.0|-0\.0|(Integer|Long)\.(MAX|MIN)_VALUE|(Double|Float)\.NaN)\s*\)|Collections\.emptyList\(\)|new\s+(ArrayList|HashMap)<>\(\)"#,
    )
    .expect("valid regex")
});

static HTTP_STATUS_ASSERTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"assertEquals\s*\(\s*(200|201|204|400|401|403|404|500|502|503)\b|HttpStatus\.(OK|CREATED|NO_CONTENT|BAD_REQUEST|UNAUTHORIZED|FORBIDDEN|NOT_FOUND|INTERNAL_SERVER_ERROR)\b",
    )
    .expect("valid regex")
});

static EXPECTED_EXCEPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"verifyException\s*\(|@Test\s*\([^)]*expected\s*=").expect("valid regex")
});

static NULL_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnull\b").expect("valid regex"));

static GOALS_COVERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) goals covered out of (\d+)").expect("valid regex"));

/// What the generated test suite of one run contains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSuiteAnalysis {
    pub test_files: u32,
    pub test_methods: u32,
    pub assertions: u32,
    pub assertion_types: BTreeMap<String, u32>,
    pub boundary_inputs: u32,
    pub http_status_assertions: u32,
    pub expected_exceptions: u32,
    pub null_references: u32,
    /// Simple names of the generated test classes, sorted
    pub test_classes: Vec<String>,
}

impl TestSuiteAnalysis {
    /// The counts stored in the run record
    pub fn counts(&self) -> ArtifactCounts {
        ArtifactCounts {
            tests_generated: self.test_files,
            test_methods: self.test_methods,
            assertions: self.assertions,
        }
    }

    /// Fold one test source file into the analysis
    pub fn add_source(&mut self, class_name: &str, source: &str) {
        self.test_files += 1;
        self.test_classes.push(class_name.to_string());
        self.test_methods += TEST_ANNOTATION.find_iter(source).count() as u32;

        for (kind, re) in ASSERTION_PATTERNS.iter() {
            let count = re.find_iter(source).count() as u32;
            if count > 0 {
                *self.assertion_types.entry(kind.to_string()).or_default() += count;
                self.assertions += count;
            }
        }

        self.boundary_inputs += BOUNDARY_INPUT.find_iter(source).count() as u32;
        self.http_status_assertions += HTTP_STATUS_ASSERTION.find_iter(source).count() as u32;
        self.expected_exceptions += EXPECTED_EXCEPTION.find_iter(source).count() as u32;
        self.null_references += NULL_LITERAL.find_iter(source).count() as u32;
    }

    /// Fold another run's analysis into this one
    pub fn merge(&mut self, other: &TestSuiteAnalysis) {
        self.test_files += other.test_files;
        self.test_methods += other.test_methods;
        self.assertions += other.assertions;
        for (kind, count) in &other.assertion_types {
            *self.assertion_types.entry(kind.clone()).or_default() += count;
        }
        self.boundary_inputs += other.boundary_inputs;
        self.http_status_assertions += other.http_status_assertions;
        self.expected_exceptions += other.expected_exceptions;
        self.null_references += other.null_references;
        self.test_classes.extend(other.test_classes.iter().cloned());
        self.test_classes.sort();
        self.test_classes.dedup();
    }

    /// Pointers for a human filling in the qualitative checklist
    pub fn evaluation_hints(&self) -> Vec<(&'static str, String)> {
        if self.test_files == 0 {
            return vec![("tests", "No generated test files found".to_string())];
        }

        let http = if self.http_status_assertions > 0 {
            format!("{} HTTP status assertions found", self.http_status_assertions)
        } else {
            "No HTTP status code assertions found".to_string()
        };

        let mut kinds: Vec<(&String, &u32)> = self.assertion_types.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let comparators = if kinds.is_empty() {
            "No assertions found".to_string()
        } else {
            kinds
                .iter()
                .take(5)
                .map(|(kind, count)| format!("{}({})", kind, count))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let value_checks = self.assertion_types.get("assertEquals").copied().unwrap_or(0);
        let null_checks = self.assertion_types.get("assertNull").copied().unwrap_or(0)
            + self.assertion_types.get("assertNotNull").copied().unwrap_or(0);
        let meaningful = if self.assertions == 0 {
            "No assertions to evaluate".to_string()
        } else if value_checks > null_checks {
            format!(
                "More value assertions ({}) than null checks ({})",
                value_checks, null_checks
            )
        } else {
            format!(
                "Review: null checks ({}) outnumber value assertions ({})",
                null_checks, value_checks
            )
        };

        let boundaries = match self.boundary_inputs {
            0 => "No boundary inputs (null, empty, 0, -1) detected".to_string(),
            n if n > 5 => format!("{} boundary inputs found", n),
            n => format!("Only {} boundary inputs found", n),
        };

        vec![
            ("asserts_http_status", http),
            ("correct_comparator", comparators),
            ("assertions_meaningful", meaningful),
            ("boundary_conditions", boundaries),
        ]
    }
}

/// Analyse every `*_ESTest.java` under `tests_dir`. A missing directory is
/// an empty suite.
pub fn analyze_tests(tests_dir: &Path) -> StorageResult<TestSuiteAnalysis> {
    let mut analysis = TestSuiteAnalysis::default();
    if !tests_dir.is_dir() {
        debug!("No generated tests directory at {}", tests_dir.display());
        return Ok(analysis);
    }

    let mut files: Vec<_> = WalkDir::new(tests_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", tests_dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(TEST_FILE_SUFFIX))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    for path in files {
        let bytes = std::fs::read(&path)?;
        let source = String::from_utf8_lossy(&bytes);
        let class_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        analysis.add_source(&class_name, &source);
    }
    analysis.test_classes.sort();

    Ok(analysis)
}

/// Progress markers found in a run log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogAnalysis {
    pub search_started: bool,
    pub search_completed: bool,
    pub compilation_errors: bool,
    pub rmi_errors: bool,
    /// (covered, total) goals, when the tool printed them
    pub coverage_goals: Option<(u64, u64)>,
}

pub fn analyze_log(log: &str) -> LogAnalysis {
    let coverage_goals = GOALS_COVERED.captures_iter(log).last().and_then(|caps| {
        let covered = caps.get(1)?.as_str().parse().ok()?;
        let total = caps.get(2)?.as_str().parse().ok()?;
        Some((covered, total))
    });

    LogAnalysis {
        search_started: log.contains("Starting Client") || log.contains("Going to generate"),
        search_completed: log.contains("Search finished") || log.contains("Writing tests"),
        compilation_errors: log.contains("Compilation failed") || log.contains("cannot find symbol"),
        rmi_errors: log.contains("NoClassDefFoundError") || log.contains("java.rmi."),
        coverage_goals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE_TEST: &str = r#"
package com.cloudhubs.trainticket.contacts.controller;

public class ContactsController_ESTest extends ContactsController_ESTest_scaffolding {

  @Test(timeout = 4000)
  public void test0() throws Throwable {
      ContactsController controller = new ContactsController();
      HttpEntity<?> entity = controller.findContactsByAccountId(null);
      assertNotNull(entity);
      assertEquals(200, entity.getStatusCodeValue());
  }

  @Test(timeout = 4000)
  public void test1() throws Throwable {
      ContactsController controller = new ContactsController();
      try {
        controller.findContactsByAccountId("");
        fail("Expecting exception: NullPointerException");
      } catch(NullPointerException e) {
         verifyException("com.cloudhubs.trainticket.contacts.service.ContactsServiceImpl", e);
      }
  }
}
"#;

    #[test]
    fn test_counts_one_source() {
        let mut analysis = TestSuiteAnalysis::default();
        analysis.add_source("ContactsController_ESTest", SAMPLE_TEST);

        assert_eq!(analysis.test_files, 1);
        assert_eq!(analysis.test_methods, 2);
        assert_eq!(analysis.assertions, 4);
        assert_eq!(analysis.assertion_types.get("assertNotNull"), Some(&1));
        assert_eq!(analysis.assertion_types.get("assertEquals"), Some(&1));
        assert_eq!(analysis.assertion_types.get("fail"), Some(&1));
        assert_eq!(analysis.assertion_types.get("verifyException"), Some(&1));
        assert!(!analysis.assertion_types.contains_key("assertNull"));
        assert_eq!(analysis.boundary_inputs, 2);
        assert_eq!(analysis.http_status_assertions, 1);
        assert_eq!(analysis.expected_exceptions, 1);
    }

    #[test]
    fn test_analyze_tests_walks_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("com").join("cloudhubs");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("ContactsController_ESTest.java"), SAMPLE_TEST).unwrap();
        std::fs::write(nested.join("OtherController_ESTest.java"), "@Test\npublic void t() {}").unwrap();
        std::fs::write(
            nested.join("ContactsController_ESTest_scaffolding.java"),
            "@Test assertEquals(1, 1);",
        )
        .unwrap();

        let analysis = analyze_tests(temp.path()).unwrap();
        assert_eq!(
            analysis.counts(),
            ArtifactCounts {
                tests_generated: 2,
                test_methods: 3,
                assertions: 4,
            }
        );
        assert_eq!(
            analysis.test_classes,
            vec!["ContactsController_ESTest", "OtherController_ESTest"]
        );
    }

    #[test]
    fn test_missing_tests_dir_is_empty_suite() {
        let temp = TempDir::new().unwrap();
        let analysis = analyze_tests(&temp.path().join("generated-tests")).unwrap();
        assert_eq!(analysis, TestSuiteAnalysis::default());
        assert_eq!(analysis.evaluation_hints().len(), 1);
    }

    #[test]
    fn test_hints_and_merge() {
        let mut first = TestSuiteAnalysis::default();
        first.add_source("A_ESTest", SAMPLE_TEST);
        let mut total = TestSuiteAnalysis::default();
        total.merge(&first);
        total.merge(&first);

        assert_eq!(total.test_files, 2);
        assert_eq!(total.assertions, 8);
        assert_eq!(total.test_classes, vec!["A_ESTest"]);

        let hints = total.evaluation_hints();
        let http = hints.iter().find(|(k, _)| *k == "asserts_http_status").unwrap();
        assert_eq!(http.1, "2 HTTP status assertions found");
    }

    #[test]
    fn test_log_analysis() {
        let log = "* Going to generate test cases for class: X\n\
                   * Search finished after 60s\n\
                   * Coverage of criterion LINE: 81%\n\
                   * 39 goals covered out of 48\n";
        let analysis = analyze_log(log);
        assert!(analysis.search_started);
        assert!(analysis.search_completed);
        assert!(!analysis.compilation_errors);
        assert!(!analysis.rmi_errors);
        assert_eq!(analysis.coverage_goals, Some((39, 48)));

        assert_eq!(analyze_log("").coverage_goals, None);
    }
}
