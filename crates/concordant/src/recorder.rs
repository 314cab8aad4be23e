//! Result recording and the summary handed back to callers.
//!
//! The recorder keeps every outcome against the element that produced it so
//! the painter can mark the same node later. Counts are derived from the
//! detail lists, which keeps them equal by construction.

use crate::document::Element;
use crate::evaluator::EvaluationError;
use crate::resource::Resource;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// What happened to one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Assertion passed
    Success,
    /// Assertion failed
    Failure {
        /// Expected text
        expected: String,
        /// Actual text
        actual: String,
    },
    /// Evaluation failed
    Exception {
        /// Evaluated expression
        expression: String,
        /// The captured error
        error: EvaluationError,
    },
    /// A produced item had no row; the element is the appended row
    MissingRow {
        /// Key text of the item
        expected: String,
    },
    /// A row matched no produced item
    SurplusRow {
        /// Key text of the row
        actual: String,
    },
}

/// An outcome bound to its element
#[derive(Debug, Clone)]
pub struct RecordedOutcome {
    /// The element the outcome belongs to
    pub element: Element,
    /// The outcome
    pub outcome: Outcome,
}

/// Detail of a failed assertion or row mismatch
#[derive(Debug, Clone)]
pub struct FailureDetail {
    /// Failing element
    pub element: Element,
    /// Expected text
    pub expected: String,
    /// Actual text
    pub actual: String,
    /// Human-readable message
    pub message: String,
}

/// Detail of an evaluation exception
#[derive(Debug, Clone)]
pub struct ExceptionDetail {
    /// Offending element
    pub element: Element,
    /// Evaluated expression
    pub expression: String,
    /// The captured error
    pub error: EvaluationError,
    /// Captured stack frames
    pub stack: Vec<String>,
}

/// Accumulates outcomes during one run.
#[derive(Debug, Default)]
pub struct ResultRecorder {
    successes: usize,
    failures: Vec<FailureDetail>,
    exceptions: Vec<ExceptionDetail>,
    outcomes: Vec<RecordedOutcome>,
}

impl ResultRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a passing assertion
    pub fn record_success(&mut self, element: &Element) {
        self.successes += 1;
        self.push(element, Outcome::Success);
    }

    /// Record a failed assertion
    pub fn record_failure(&mut self, element: &Element, expected: &str, actual: &str) {
        self.failures.push(FailureDetail {
            element: element.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            message: format!("expected '{expected}' but was '{actual}'"),
        });
        self.push(
            element,
            Outcome::Failure {
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
        );
    }

    /// Record an evaluation exception
    pub fn record_exception(&mut self, element: &Element, expression: &str, error: &EvaluationError) {
        self.exceptions.push(ExceptionDetail {
            element: element.clone(),
            expression: expression.to_string(),
            error: error.clone(),
            stack: error.stack().to_vec(),
        });
        self.push(
            element,
            Outcome::Exception {
                expression: expression.to_string(),
                error: error.clone(),
            },
        );
    }

    /// Record an item with no matching row. Counts as a failure.
    pub fn record_missing_row(&mut self, row: &Element, expected: &str) {
        self.failures.push(FailureDetail {
            element: row.clone(),
            expected: expected.to_string(),
            actual: String::new(),
            message: format!("missing row '{expected}'"),
        });
        self.push(
            row,
            Outcome::MissingRow {
                expected: expected.to_string(),
            },
        );
    }

    /// Record a row with no matching item. Counts as a failure.
    pub fn record_surplus_row(&mut self, row: &Element, actual: &str) {
        self.failures.push(FailureDetail {
            element: row.clone(),
            expected: String::new(),
            actual: actual.to_string(),
            message: format!("surplus row '{actual}'"),
        });
        self.push(
            row,
            Outcome::SurplusRow {
                actual: actual.to_string(),
            },
        );
    }

    fn push(&mut self, element: &Element, outcome: Outcome) {
        self.outcomes.push(RecordedOutcome {
            element: element.clone(),
            outcome,
        });
    }

    /// Close the run and produce its immutable summary
    #[must_use]
    pub fn finish(self, resource: Resource) -> ResultSummary {
        ResultSummary {
            resource,
            successes: self.successes,
            failures: self.failures,
            exceptions: self.exceptions,
            outcomes: self.outcomes,
        }
    }
}

/// Immutable outcome of one run.
#[derive(Debug, Clone)]
pub struct ResultSummary {
    resource: Resource,
    successes: usize,
    failures: Vec<FailureDetail>,
    exceptions: Vec<ExceptionDetail>,
    outcomes: Vec<RecordedOutcome>,
}

impl ResultSummary {
    /// Specification this summary belongs to
    #[must_use]
    pub const fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Number of passing assertions
    #[must_use]
    pub const fn success_count(&self) -> usize {
        self.successes
    }

    /// Number of failures (assertions and row mismatches)
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Number of exceptions
    #[must_use]
    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }

    /// Failure details in recording order
    #[must_use]
    pub fn failures(&self) -> &[FailureDetail] {
        &self.failures
    }

    /// Exception details in recording order
    #[must_use]
    pub fn exceptions(&self) -> &[ExceptionDetail] {
        &self.exceptions
    }

    /// Every outcome in recording order
    #[must_use]
    pub fn outcomes(&self) -> &[RecordedOutcome] {
        &self.outcomes
    }

    /// Whether any failure was recorded
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Whether any exception was recorded
    #[must_use]
    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }

    /// No failures and no exceptions
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.has_failures() && !self.has_exceptions()
    }

    /// Plain-text report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{}\nSuccesses: {}, Failures: {}, Exceptions: {}\n",
            self.resource,
            self.success_count(),
            self.failure_count(),
            self.exception_count()
        );
        for failure in &self.failures {
            let _ = writeln!(out, "  FAILURE {:?}: {}", failure.element, failure.message);
        }
        for exception in &self.exceptions {
            let _ = writeln!(
                out,
                "  EXCEPTION {:?}: {} ({})",
                exception.element,
                exception.error,
                exception.error.kind()
            );
            for frame in &exception.stack {
                let _ = writeln!(out, "      at {frame}");
            }
        }
        out
    }

    /// Serialisable view of the summary
    #[must_use]
    pub fn report(&self) -> SummaryReport {
        SummaryReport {
            resource: self.resource.clone(),
            success: self.is_success(),
            successes: self.success_count(),
            failures: self
                .failures
                .iter()
                .map(|f| FailureReport {
                    element: format!("{:?}", f.element),
                    expected: f.expected.clone(),
                    actual: f.actual.clone(),
                    message: f.message.clone(),
                })
                .collect(),
            exceptions: self
                .exceptions
                .iter()
                .map(|e| ExceptionReport {
                    element: format!("{:?}", e.element),
                    expression: e.expression.clone(),
                    kind: e.error.kind().to_string(),
                    message: e.error.to_string(),
                    stack: e.stack.clone(),
                })
                .collect(),
        }
    }
}

/// JSON/YAML form of a [`ResultSummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    /// Specification resource
    pub resource: Resource,
    /// Overall verdict
    pub success: bool,
    /// Passing assertions
    pub successes: usize,
    /// Failure details
    pub failures: Vec<FailureReport>,
    /// Exception details
    pub exceptions: Vec<ExceptionReport>,
}

/// Serialised failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Element description
    pub element: String,
    /// Expected text
    pub expected: String,
    /// Actual text
    pub actual: String,
    /// Message
    pub message: String,
}

/// Serialised exception
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionReport {
    /// Element description
    pub element: String,
    /// Expression
    pub expression: String,
    /// Error kind
    pub kind: String,
    /// Error message
    pub message: String,
    /// Stack frames
    pub stack: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thrown() -> EvaluationError {
        EvaluationError::Thrown {
            expression: "boom()".to_string(),
            message: "kaboom".to_string(),
            stack: vec!["Fixture.boom".to_string()],
        }
    }

    #[test]
    fn test_empty_summary_is_success() {
        let summary = ResultRecorder::new().finish(Resource::new("/a.html"));
        assert!(summary.is_success());
        assert_eq!(summary.success_count(), 0);
        assert_eq!(summary.failure_count(), 0);
        assert_eq!(summary.exception_count(), 0);
    }

    #[test]
    fn test_counts_match_details() {
        let e = Element::new("span");
        let mut recorder = ResultRecorder::new();
        recorder.record_success(&e);
        recorder.record_failure(&e, "a", "b");
        recorder.record_missing_row(&Element::new("tr"), "value2");
        recorder.record_exception(&e, "boom()", &thrown());
        let summary = recorder.finish(Resource::new("/a.html"));

        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.failure_count(), summary.failures().len());
        assert_eq!(summary.failure_count(), 2);
        assert_eq!(summary.exception_count(), 1);
        assert_eq!(summary.outcomes().len(), 4);
        assert!(summary.has_failures());
        assert!(summary.has_exceptions());
        assert!(!summary.is_success());
        assert_eq!(summary.exceptions()[0].stack, vec!["Fixture.boom".to_string()]);
    }

    #[test]
    fn test_render_text() {
        let mut recorder = ResultRecorder::new();
        recorder.record_failure(&Element::new("span"), "42.0", "42");
        let text = recorder.finish(Resource::new("/spec/A.html")).render_text();
        assert!(text.starts_with("/spec/A.html\nSuccesses: 0, Failures: 1, Exceptions: 0"));
        assert!(text.contains("expected '42.0' but was '42'"));
    }

    #[test]
    fn test_report_serialises() {
        let mut recorder = ResultRecorder::new();
        recorder.record_exception(&Element::new("span"), "boom()", &thrown());
        let report = recorder.finish(Resource::new("/a.html")).report();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["exceptions"][0]["kind"], "EvaluationException");
        assert_eq!(json["resource"], "/a.html");
    }
}
