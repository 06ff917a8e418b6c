//! Failure classification over captured run logs
//!
//! Rules are evaluated strictly in the order returned by
//! [`ErrorClassifier::default_rules`]; the first match wins. More specific
//! signatures must stay ahead of the generic ones they overlap with (missing
//! classes before compilation, RMI serialization before runtime exceptions).

use genbench_core::record::truncate_message;
use genbench_core::{ErrorCounts, ErrorType};
use once_cell::sync::Lazy;
use regex::Regex;

static ERROR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\[ERROR\]|\berror:|^ERROR\b)").expect("valid regex"));
static MISSING_PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"package [\w.]+ does not exist").expect("valid regex"));
static MISSING_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"cannot find symbol").expect("valid regex"));

/// Predicate over log text
#[derive(Debug, Clone)]
pub enum LogMatcher {
    /// Plain substring
    Contains(String),
    /// Regular expression
    Pattern(Regex),
    /// Match if all sub-matchers match
    All(Vec<LogMatcher>),
    /// Match if any sub-matcher matches
    Any(Vec<LogMatcher>),
    /// Match if the sub-matcher does not match
    Not(Box<LogMatcher>),
}

impl LogMatcher {
    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains(value.into())
    }

    /// Compile a pattern. Only used with literal patterns.
    pub fn pattern(pattern: &str) -> Self {
        Self::Pattern(Regex::new(pattern).expect("classifier patterns are valid regexes"))
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Contains(value) => text.contains(value.as_str()),
            Self::Pattern(re) => re.is_match(text),
            Self::All(matchers) => matchers.iter().all(|m| m.matches(text)),
            Self::Any(matchers) => matchers.iter().any(|m| m.matches(text)),
            Self::Not(matcher) => !matcher.matches(text),
        }
    }
}

/// One step of the cascade
#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub label: ErrorType,
    /// Evaluated against the whole log
    pub detect: LogMatcher,
    /// Picks the representative line; defaults to `detect` applied per line
    pub extract: Option<LogMatcher>,
}

impl ClassificationRule {
    pub fn new(label: ErrorType, detect: LogMatcher) -> Self {
        Self {
            label,
            detect,
            extract: None,
        }
    }

    pub fn with_extract(mut self, extract: LogMatcher) -> Self {
        self.extract = Some(extract);
        self
    }

    fn representative_line<'a>(&self, log: &'a str) -> Option<&'a str> {
        let matcher = self.extract.as_ref().unwrap_or(&self.detect);
        log.lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && matcher.matches(line))
    }
}

/// Outcome of classifying one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub error_type: ErrorType,
    pub message: String,
    pub error_counts: ErrorCounts,
}

/// Ordered rule cascade
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    rules: Vec<ClassificationRule>,
    max_message_chars: usize,
}

impl ErrorClassifier {
    pub fn new(rules: Vec<ClassificationRule>, max_message_chars: usize) -> Self {
        Self {
            rules,
            max_message_chars,
        }
    }

    /// Classifier with the built-in cascade
    pub fn with_defaults(max_message_chars: usize) -> Self {
        Self::new(Self::default_rules(), max_message_chars)
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Assign exactly one label to a run.
    ///
    /// `NONE` iff the exit code is zero. A run the harness killed at its
    /// deadline is `TIMEOUT` whatever it logged before dying.
    pub fn classify(&self, exit_code: i32, timed_out: bool, log: &str) -> Classification {
        let error_counts = count_errors(log);

        if exit_code == 0 && !timed_out {
            return Classification {
                error_type: ErrorType::None,
                message: String::new(),
                error_counts,
            };
        }

        if timed_out {
            let line = self
                .rules
                .iter()
                .find(|rule| rule.label == ErrorType::Timeout)
                .and_then(|rule| rule.representative_line(log))
                .map(str::to_string)
                .unwrap_or_else(|| "Run exceeded its deadline and was terminated".to_string());
            return self.finish(ErrorType::Timeout, &line, error_counts);
        }

        for rule in &self.rules {
            if rule.detect.matches(log) {
                let line = rule
                    .representative_line(log)
                    .map(str::to_string)
                    .unwrap_or_else(|| rule.label.description().to_string());
                return self.finish(rule.label, &line, error_counts);
            }
        }

        let line = last_meaningful_line(log)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Exit code {} with no output", exit_code));
        self.finish(ErrorType::UnknownFailure, &line, error_counts)
    }

    fn finish(&self, error_type: ErrorType, line: &str, error_counts: ErrorCounts) -> Classification {
        Classification {
            error_type,
            message: truncate_message(line, self.max_message_chars),
            error_counts,
        }
    }

    /// Built-in cascade, in priority order
    pub fn default_rules() -> Vec<ClassificationRule> {
        vec![
            ClassificationRule::new(
                ErrorType::NoClassFiles,
                LogMatcher::pattern(
                    r"(?i)(no (compiled )?\.?class files|no compiled classes|could not find any classes|target/classes\S*\s+(does not exist|is empty|not found))",
                ),
            ),
            ClassificationRule::new(
                ErrorType::CompilationMissingDependency,
                LogMatcher::Any(vec![
                    LogMatcher::pattern(r"package [\w.]+ does not exist"),
                    LogMatcher::pattern(r"(?i)could not resolve dependencies"),
                ]),
            ),
            ClassificationRule::new(
                ErrorType::RmiSerialization,
                LogMatcher::Any(vec![
                    // The Spring type is often named only in a `Caused by:` far below
                    LogMatcher::All(vec![
                        LogMatcher::contains("NoClassDefFoundError"),
                        LogMatcher::pattern(r"HttpEntity|ResponseEntity|org[/.]springframework"),
                    ]),
                    LogMatcher::contains("UnmarshalException"),
                    LogMatcher::contains("NotSerializableException"),
                    LogMatcher::pattern(r"(?i)error (un)?marshall?ing (return|arguments)"),
                ]),
            )
            .with_extract(LogMatcher::pattern(
                r"NoClassDefFoundError|UnmarshalException|NotSerializableException|(?i)error (un)?marshall?ing",
            )),
            ClassificationRule::new(
                ErrorType::ExternalToolError,
                LogMatcher::pattern(
                    r"(?im)(^\s*\*\s*error\b|evosuite[^\n]*(internal error|crashed)|org\.evosuite\.\S*(Exception|Error)\b)",
                ),
            ),
            ClassificationRule::new(
                ErrorType::Compilation,
                LogMatcher::pattern(
                    r"(?i)(compilation (failed|error)|cannot find symbol|\.java:\[?\d+[,\]:][^\n]*error)",
                ),
            ),
            ClassificationRule::new(
                ErrorType::Timeout,
                LogMatcher::pattern(
                    r"(?i)(deadline [^\n]*exceeded|timed out|timeout (expired|reached)|global timeout)",
                ),
            ),
            ClassificationRule::new(
                ErrorType::OutOfMemory,
                LogMatcher::pattern(r"(?i)(OutOfMemoryError|out of memory|GC overhead limit exceeded|OOMKilled)"),
            ),
            ClassificationRule::new(
                ErrorType::RmiConnection,
                LogMatcher::pattern(
                    r"(?i)(java\.rmi\.\w*(ConnectException|ConnectIOException|NoSuchObjectException)|connection refused to host|rmi[^\n]*(registry|connection)[^\n]*(refused|failed|lost))",
                ),
            ),
            ClassificationRule::new(
                ErrorType::ContainerError,
                LogMatcher::pattern(
                    r"(?i)(^docker: |cannot connect to the docker daemon|unable to find image|oci runtime|no such container|error response from daemon)",
                ),
            )
            .with_extract(LogMatcher::pattern(
                r"(?i)(docker|oci runtime|container|daemon)",
            )),
            ClassificationRule::new(
                ErrorType::RuntimeException,
                LogMatcher::pattern(r"(Exception in thread|\b[\w.$]*Exception\b|\b[\w.$]+Error: )"),
            ),
        ]
    }
}

/// Count diagnostic lines in a log
pub fn count_errors(log: &str) -> ErrorCounts {
    let mut counts = ErrorCounts::default();
    for line in log.lines() {
        if ERROR_LINE.is_match(line) {
            counts.total_errors += 1;
        }
        counts.missing_packages += MISSING_PACKAGE.find_iter(line).count() as u32;
        counts.missing_symbols += MISSING_SYMBOL.find_iter(line).count() as u32;
    }
    counts
}

fn last_meaningful_line(log: &str) -> Option<&str> {
    log.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("[genbench]"))
}
