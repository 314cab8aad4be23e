//! Outcome painting.
//!
//! Marks recorded outcomes on the very elements that produced them:
//!
//! | Outcome     | Markup                                                        |
//! |-------------|---------------------------------------------------------------|
//! | success     | `class="success"`                                             |
//! | failure     | `class="failure"`, `<del class="expected">` + `<ins class="actual">` |
//! | exception   | `class="exception"`, message span and stack-trace block       |
//! | missing row | `class="missing"`                                             |
//! | surplus row | `class="surplus"`                                             |
//!
//! Painting is idempotent: an element already carrying the marker class for
//! an outcome is left alone.

use crate::document::{Document, Element, ElementError};
use crate::recorder::{Outcome, RecordedOutcome};

/// Stylesheet for the outcome markers
pub const DEFAULT_CSS: &str = "\
.success { background-color: #afa; }
.failure { background-color: #ffb0b0; }
.failure del.expected { text-decoration: line-through; }
.failure ins.actual { text-decoration: none; margin-left: 0.5em; }
.exception { background-color: #fdd; }
.exceptionMessage { display: block; color: #c00; font-weight: bold; }
.stackTrace { font-family: monospace; font-size: 0.8em; padding: 0.5em; background-color: #fee; }
.stackTraceEntry { white-space: pre; }
tr.missing { background-color: #ffb0b0; font-style: italic; }
tr.surplus { background-color: #ffb0b0; text-decoration: line-through; }
";

/// A painting problem that did not stop the other outcomes from being painted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDiagnostic {
    /// Element that could not be painted
    pub element: String,
    /// What went wrong
    pub message: String,
}

/// Rewrites elements to show their outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomePainter;

impl OutcomePainter {
    /// Create a painter
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Paint every outcome. Problems are returned, never raised.
    pub fn paint(&self, outcomes: &[RecordedOutcome]) -> Vec<RenderDiagnostic> {
        outcomes
            .iter()
            .filter_map(|recorded| {
                self.paint_one(&recorded.element, &recorded.outcome)
                    .err()
                    .map(|e| RenderDiagnostic {
                        element: format!("{:?}", recorded.element),
                        message: e.to_string(),
                    })
            })
            .collect()
    }

    fn paint_one(&self, element: &Element, outcome: &Outcome) -> Result<(), ElementError> {
        match outcome {
            Outcome::Success => {
                element.add_class("success");
                Ok(())
            }
            Outcome::Failure { actual, .. } => paint_failure(element, actual),
            Outcome::Exception { error, expression } => {
                let message = error.to_string();
                let painted = element
                    .child_elements()?
                    .iter()
                    .any(|child| child.has_class("exceptionMessage") && child.text() == message);
                if painted {
                    return Ok(());
                }
                element.add_class("exception");
                element.append_child(&span("exceptionMessage", &message))?;

                let trace = Element::new("div");
                trace.add_class("stackTrace");
                trace.append_child(&Element::with_text(
                    "p",
                    &format!("While evaluating expression: {expression}"),
                ))?;
                for frame in error.stack() {
                    let entry = Element::with_text("div", frame);
                    entry.add_class("stackTraceEntry");
                    trace.append_child(&entry)?;
                }
                element.append_child(&trace)
            }
            Outcome::MissingRow { .. } => {
                element.add_class("missing");
                Ok(())
            }
            Outcome::SurplusRow { .. } => {
                element.add_class("surplus");
                Ok(())
            }
        }
    }

    /// Embed a stylesheet into `<head>`.
    pub fn embed_css(&self, document: &Document, css: &str) -> Result<(), ElementError> {
        let style = Element::with_text("style", css);
        style.set_attribute("type", "text/css");
        document.head()?.append_child(&style)
    }
}

fn span(class: &str, text: &str) -> Element {
    let element = Element::with_text("span", text);
    element.add_class(class);
    element
}

fn paint_failure(element: &Element, actual: &str) -> Result<(), ElementError> {
    if element.has_class("failure") {
        return Ok(());
    }
    element.add_class("failure");
    let expected = Element::new("del");
    expected.add_class("expected");
    element.move_children_to(&expected)?;
    element.append_child(&expected)?;

    let actual = Element::with_text("ins", actual);
    actual.add_class("actual");
    expected.insert_after(&actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationError;
    use crate::recorder::ResultRecorder;
    use crate::resource::Resource;

    fn span_in(html: &str) -> (Document, Element) {
        let doc = Document::parse(html, Resource::new("/t.html"));
        let span = doc.body().unwrap().descendants("span").unwrap().next().unwrap();
        (doc, span)
    }

    mod painting_tests {
        use super::*;

        #[test]
        fn test_failure_wraps_expected_and_actual() {
            let (doc, span) = span_in("<p><span>42.0</span></p>");
            let mut recorder = ResultRecorder::new();
            recorder.record_failure(&span, "42.0", "42");
            let summary = recorder.finish(Resource::new("/t.html"));
            assert!(OutcomePainter::new().paint(summary.outcomes()).is_empty());

            let html = doc.to_html().unwrap();
            assert!(html.contains(
                "<span class=\"failure\"><del class=\"expected\">42.0</del><ins class=\"actual\">42</ins></span>"
            ));
        }

        #[test]
        fn test_exception_renders_escaped_trace() {
            let (doc, span) = span_in("<span>x</span>");
            let error = EvaluationError::Thrown {
                expression: "boom()".to_string(),
                message: "<bad> & worse".to_string(),
                stack: vec!["Fixture.boom".to_string()],
            };
            let mut recorder = ResultRecorder::new();
            recorder.record_exception(&span, "boom()", &error);
            let summary = recorder.finish(Resource::new("/t.html"));
            OutcomePainter::new().paint(summary.outcomes());

            let html = doc.to_html().unwrap();
            assert!(html.contains("<span class=\"exceptionMessage\">&lt;bad&gt; &amp; worse</span>"));
            assert!(html.contains("<div class=\"stackTraceEntry\">Fixture.boom</div>"));
        }

        #[test]
        fn test_stale_element_is_a_diagnostic() {
            let (_doc, span) = span_in("<p><span>x</span><b>y</b></p>");
            let bold = span.parent().unwrap().unwrap().child_elements().unwrap()[1].clone();
            let mut recorder = ResultRecorder::new();
            recorder.record_failure(&span, "x", "z");
            recorder.record_success(&bold);
            span.remove().unwrap();
            let summary = recorder.finish(Resource::new("/t.html"));

            let diagnostics = OutcomePainter::new().paint(summary.outcomes());
            assert_eq!(diagnostics.len(), 1);
            assert!(bold.has_class("success"));
            assert_eq!(summary.failure_count(), 1);
        }
    }

    mod idempotence_tests {
        use super::*;

        #[test]
        fn test_painting_twice_is_stable() {
            let (doc, span) = span_in("<span>a</span><span>b</span>");
            let other = doc.body().unwrap().descendants("span").unwrap().nth(1).unwrap();
            let mut recorder = ResultRecorder::new();
            recorder.record_failure(&span, "a", "c");
            recorder.record_success(&other);
            let summary = recorder.finish(Resource::new("/t.html"));

            let painter = OutcomePainter::new();
            painter.paint(summary.outcomes());
            let once = doc.to_html().unwrap();
            painter.paint(summary.outcomes());
            assert_eq!(doc.to_html().unwrap(), once);
        }

        fn thrown(message: &str) -> EvaluationError {
            EvaluationError::Thrown {
                expression: "rows()".to_string(),
                message: message.to_string(),
                stack: Vec::new(),
            }
        }

        #[test]
        fn test_distinct_exceptions_on_one_element_are_all_painted() {
            let (doc, span) = span_in("<span>x</span>");
            let mut recorder = ResultRecorder::new();
            recorder.record_exception(&span, "rows()", &thrown("first key missing"));
            recorder.record_exception(&span, "rows()", &thrown("second key missing"));
            let summary = recorder.finish(Resource::new("/t.html"));

            let painter = OutcomePainter::new();
            assert!(painter.paint(summary.outcomes()).is_empty());
            painter.paint(summary.outcomes());

            let html = doc.to_html().unwrap();
            assert_eq!(html.matches("class=\"exceptionMessage\"").count(), 2);
            assert!(html.contains(">first key missing</span>"));
            assert!(html.contains(">second key missing</span>"));
            assert_eq!(span.attribute("class").as_deref(), Some("exception"));
        }
    }
}
