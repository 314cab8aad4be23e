//! Nested runs for the `run` command.
//!
//! A [`NestedRunner`] turns a link in one specification into the verdict of
//! another. [`FixtureRunner`] reads the linked document from a
//! [`SpecificationSource`], asks a provider for its fixture and processes it
//! with the calling engine one level deeper.

use crate::engine::{ProcessContext, ProcessOutput, SpecificationEngine};
use crate::evaluator::EvaluationError;
use crate::fixture::Fixture;
use crate::recorder::ResultSummary;
use crate::resource::Resource;
use crate::result::ConcordantError;
use crate::source::SpecificationSource;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;
use tracing::info;

/// Coarse result of a nested run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunVerdict {
    /// No failures, no exceptions
    Success,
    /// At least one failure, no exceptions
    Failure,
    /// At least one exception
    Exception,
}

impl RunVerdict {
    /// Verdict of a finished run
    #[must_use]
    pub fn from_summary(summary: &ResultSummary) -> Self {
        if summary.has_exceptions() {
            Self::Exception
        } else if summary.has_failures() {
            Self::Failure
        } else {
            Self::Success
        }
    }

    /// Lower-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Exception => "exception",
        }
    }

    /// Parse a name, ignoring case and surrounding whitespace
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "exception" => Some(Self::Exception),
            _ => None,
        }
    }
}

impl fmt::Display for RunVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to run a linked specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Name of the calling fixture
    pub caller: String,
    /// Linked document, resolved against the calling document
    pub resource: Resource,
    /// The link as written
    pub href: String,
    /// Nesting depth of the nested run (the top-level run is 0)
    pub depth: usize,
}

/// Why a nested run produced no verdict.
///
/// Every variant except [`Aborted`](Self::Aborted) is recorded as an exception
/// on the `run` element; an aborted nested run aborts the calling run too.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// No runner registered under this name
    #[error("no runner named '{name}'")]
    UnknownRunner {
        /// Requested runner
        name: String,
    },

    /// The provider has no fixture for the linked document
    #[error("no fixture for {resource}")]
    UnknownFixture {
        /// Linked document
        resource: Resource,
    },

    /// The fixture for the linked document could not be loaded
    #[error("cannot load fixture for {resource}: {message}")]
    Fixture {
        /// Linked document
        resource: Resource,
        /// Underlying error
        message: String,
    },

    /// The linked document could not be read
    #[error("cannot read {resource}: {message}")]
    Source {
        /// Linked document
        resource: Resource,
        /// Underlying error
        message: String,
    },

    /// Nested runs went too deep
    #[error("nesting depth {depth} exceeds the maximum of {max}")]
    DepthExceeded {
        /// Requested depth
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// The nested run aborted with a configuration, listener or I/O error
    #[error(transparent)]
    Aborted(ConcordantError),
}

impl RunnerError {
    /// Form recorded against the `run` element
    #[must_use]
    pub fn to_evaluation_error(&self, expression: &str) -> EvaluationError {
        match self {
            Self::UnknownRunner { name } => EvaluationError::TargetNotFound {
                expression: expression.to_string(),
                target: name.clone(),
            },
            other => EvaluationError::Thrown {
                expression: expression.to_string(),
                message: other.to_string(),
                stack: Vec::new(),
            },
        }
    }
}

/// Runs a linked specification and reports its verdict.
pub trait NestedRunner {
    /// Execute the request
    fn run(&self, engine: &SpecificationEngine, request: &RunRequest) -> Result<RunVerdict, RunnerError>;
}

type FixtureProvider = Box<dyn Fn(&RunRequest) -> Result<Box<dyn Fixture>, RunnerError>>;

/// Runner backed by a document source and a fixture provider.
///
/// Outputs of nested runs are kept so the caller can write them next to the
/// calling document.
pub struct FixtureRunner {
    source: Rc<dyn SpecificationSource>,
    fixtures: FixtureProvider,
    outputs: RefCell<Vec<ProcessOutput>>,
}

impl fmt::Debug for FixtureRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureRunner")
            .field("outputs", &self.outputs.borrow().len())
            .finish()
    }
}

impl FixtureRunner {
    /// Create a runner. The provider answers [`RunnerError::UnknownFixture`]
    /// or [`RunnerError::Fixture`] when it cannot supply a fixture.
    pub fn new<F>(source: Rc<dyn SpecificationSource>, fixtures: F) -> Self
    where
        F: Fn(&RunRequest) -> Result<Box<dyn Fixture>, RunnerError> + 'static,
    {
        Self {
            source,
            fixtures: Box::new(fixtures),
            outputs: RefCell::new(Vec::new()),
        }
    }

    /// Take the outputs of every nested run so far
    pub fn take_outputs(&self) -> Vec<ProcessOutput> {
        std::mem::take(&mut *self.outputs.borrow_mut())
    }
}

impl NestedRunner for FixtureRunner {
    fn run(&self, engine: &SpecificationEngine, request: &RunRequest) -> Result<RunVerdict, RunnerError> {
        let html = self
            .source
            .read(&request.resource)
            .map_err(|e| RunnerError::Source {
                resource: request.resource.clone(),
                message: e.to_string(),
            })?;
        let mut fixture = (self.fixtures)(request)?;

        let context = ProcessContext::nested(request.depth, &request.caller);
        let output = engine
            .process_with_context(fixture.as_mut(), &html, request.resource.clone(), &context)
            .map_err(RunnerError::Aborted)?;

        let verdict = RunVerdict::from_summary(&output.summary);
        info!(resource = %request.resource, depth = request.depth, %verdict, "nested run finished");
        self.outputs.borrow_mut().push(output);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;
    use crate::recorder::ResultRecorder;

    #[test]
    fn test_verdict_from_summary() {
        let e = Element::new("span");
        let mut recorder = ResultRecorder::new();
        recorder.record_failure(&e, "a", "b");
        assert_eq!(
            RunVerdict::from_summary(&recorder.finish(Resource::root())),
            RunVerdict::Failure
        );
        assert_eq!(
            RunVerdict::from_summary(&ResultRecorder::new().finish(Resource::root())),
            RunVerdict::Success
        );
    }

    #[test]
    fn test_verdict_parse() {
        assert_eq!(RunVerdict::parse(" Failure "), Some(RunVerdict::Failure));
        assert_eq!(RunVerdict::parse("EXCEPTION"), Some(RunVerdict::Exception));
        assert_eq!(RunVerdict::parse("passed"), None);
    }

    #[test]
    fn test_unknown_runner_is_target_not_found() {
        let err = RunnerError::UnknownRunner {
            name: "nested".to_string(),
        };
        assert!(matches!(
            err.to_evaluation_error("nested"),
            EvaluationError::TargetNotFound { .. }
        ));
        let depth = RunnerError::DepthExceeded { depth: 17, max: 16 };
        assert_eq!(
            depth.to_evaluation_error("nested").to_string(),
            "nesting depth 17 exceeds the maximum of 16"
        );
    }

    #[test]
    fn test_fixture_error_keeps_message() {
        let err = RunnerError::Fixture {
            resource: Resource::new("/Child.html"),
            message: "invalid type: sequence".to_string(),
        };
        let recorded = err.to_evaluation_error("concordant");
        assert_eq!(recorded.kind(), "EvaluationException");
        assert_eq!(
            recorded.to_string(),
            "cannot load fixture for /Child.html: invalid type: sequence"
        );
    }
}
