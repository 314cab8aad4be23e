//! Listener bus.
//!
//! Listeners observe a run at fixed points in the pipeline. They run
//! synchronously, in registration order, and any error they return aborts the
//! run: listeners are test infrastructure and must not fail silently.

use crate::command::CallGraph;
use crate::document::{Document, Element};
use crate::evaluator::EvaluationError;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Error returned by a listener. Always fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{listener}: {message}")]
pub struct ListenerError {
    /// Name of the failing listener
    pub listener: String,
    /// Error message
    pub message: String,
}

impl ListenerError {
    /// Create a listener error
    #[must_use]
    pub fn new(listener: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            message: message.into(),
        }
    }
}

/// Result type for listener callbacks
pub type ListenerResult = Result<(), ListenerError>;

/// An assertion passed
#[derive(Debug, Clone)]
pub struct AssertSuccessEvent {
    /// Asserting element
    pub element: Element,
}

/// An assertion failed
#[derive(Debug, Clone)]
pub struct AssertFailureEvent {
    /// Asserting element
    pub element: Element,
    /// Expected text
    pub expected: String,
    /// Actual text
    pub actual: String,
}

/// An execute command evaluated its expression
#[derive(Debug, Clone)]
pub struct ExecuteEvent {
    /// Executing element
    pub element: Element,
    /// Evaluated expression
    pub expression: String,
}

/// A verify-rows command produced its sequence
#[derive(Debug, Clone)]
pub struct ExpressionEvaluatedEvent {
    /// The table element
    pub element: Element,
    /// Sequence expression
    pub expression: String,
    /// Produced items
    pub items: Vec<Value>,
}

/// A produced item had no matching row; `row` is the row appended for it
#[derive(Debug, Clone)]
pub struct MissingRowEvent {
    /// Appended row
    pub row: Element,
    /// Key text of the unmatched item
    pub expected: String,
}

/// An existing row matched no produced item
#[derive(Debug, Clone)]
pub struct SurplusRowEvent {
    /// The surplus row
    pub row: Element,
    /// Key text of the row
    pub actual: String,
}

/// Evaluation of a command threw
#[derive(Debug, Clone)]
pub struct ExceptionEvent {
    /// Offending element
    pub element: Element,
    /// Expression being evaluated
    pub expression: String,
    /// The captured error
    pub error: EvaluationError,
}

/// Observes a document after parsing, before the call graph is built.
pub trait DocumentParsingListener {
    /// The document was parsed
    fn document_parsed(&self, document: &Document) -> ListenerResult;
}

/// Observes call-graph construction and final document assembly.
pub trait BuildListener {
    /// The call graph was built, nothing has run yet
    fn call_graph_built(&self, _document: &Document, _graph: &CallGraph) -> ListenerResult {
        Ok(())
    }

    /// Outcomes were painted, the document is about to be serialised
    fn document_built(&self, _document: &Document) -> ListenerResult {
        Ok(())
    }
}

/// Observes assertion outcomes.
pub trait AssertListener {
    /// An assertion passed
    fn success_reported(&self, _event: &AssertSuccessEvent) -> ListenerResult {
        Ok(())
    }

    /// An assertion failed
    fn failure_reported(&self, _event: &AssertFailureEvent) -> ListenerResult {
        Ok(())
    }
}

/// Observes execute commands.
pub trait ExecuteListener {
    /// An execute command finished evaluating
    fn execute_completed(&self, event: &ExecuteEvent) -> ListenerResult;
}

/// Observes row reconciliation.
pub trait VerifyRowsListener {
    /// The row sequence was produced
    fn expression_evaluated(&self, _event: &ExpressionEvaluatedEvent) -> ListenerResult {
        Ok(())
    }

    /// An item had no row
    fn missing_row(&self, _event: &MissingRowEvent) -> ListenerResult {
        Ok(())
    }

    /// A row had no item
    fn surplus_row(&self, _event: &SurplusRowEvent) -> ListenerResult {
        Ok(())
    }
}

/// Observes evaluation errors recorded as exceptions.
pub trait ExceptionListener {
    /// An exception outcome was recorded
    fn exception_caught(&self, event: &ExceptionEvent) -> ListenerResult;
}

/// Ordered listener lists, read-only once the extension set is built.
#[derive(Default, Clone)]
pub struct ListenerBus {
    parsing: Vec<Rc<dyn DocumentParsingListener>>,
    build: Vec<Rc<dyn BuildListener>>,
    assert: Vec<Rc<dyn AssertListener>>,
    execute: Vec<Rc<dyn ExecuteListener>>,
    verify_rows: Vec<Rc<dyn VerifyRowsListener>>,
    exception: Vec<Rc<dyn ExceptionListener>>,
}

impl fmt::Debug for ListenerBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerBus")
            .field("parsing", &self.parsing.len())
            .field("build", &self.build.len())
            .field("assert", &self.assert.len())
            .field("execute", &self.execute.len())
            .field("verify_rows", &self.verify_rows.len())
            .field("exception", &self.exception.len())
            .finish()
    }
}

impl ListenerBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_parsing(&mut self, listener: Rc<dyn DocumentParsingListener>) {
        self.parsing.push(listener);
    }

    pub(crate) fn add_build(&mut self, listener: Rc<dyn BuildListener>) {
        self.build.push(listener);
    }

    pub(crate) fn add_assert(&mut self, listener: Rc<dyn AssertListener>) {
        self.assert.push(listener);
    }

    pub(crate) fn add_execute(&mut self, listener: Rc<dyn ExecuteListener>) {
        self.execute.push(listener);
    }

    pub(crate) fn add_verify_rows(&mut self, listener: Rc<dyn VerifyRowsListener>) {
        self.verify_rows.push(listener);
    }

    pub(crate) fn add_exception(&mut self, listener: Rc<dyn ExceptionListener>) {
        self.exception.push(listener);
    }

    /// Total registered listeners
    #[must_use]
    pub fn len(&self) -> usize {
        self.parsing.len()
            + self.build.len()
            + self.assert.len()
            + self.execute.len()
            + self.verify_rows.len()
            + self.exception.len()
    }

    /// Whether no listener is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire `document_parsed`
    pub fn document_parsed(&self, document: &Document) -> ListenerResult {
        self.parsing.iter().try_for_each(|l| l.document_parsed(document))
    }

    /// Fire `call_graph_built`
    pub fn call_graph_built(&self, document: &Document, graph: &CallGraph) -> ListenerResult {
        self.build
            .iter()
            .try_for_each(|l| l.call_graph_built(document, graph))
    }

    /// Fire `document_built`
    pub fn document_built(&self, document: &Document) -> ListenerResult {
        self.build.iter().try_for_each(|l| l.document_built(document))
    }

    /// Fire `success_reported`
    pub fn success_reported(&self, event: &AssertSuccessEvent) -> ListenerResult {
        self.assert.iter().try_for_each(|l| l.success_reported(event))
    }

    /// Fire `failure_reported`
    pub fn failure_reported(&self, event: &AssertFailureEvent) -> ListenerResult {
        self.assert.iter().try_for_each(|l| l.failure_reported(event))
    }

    /// Fire `execute_completed`
    pub fn execute_completed(&self, event: &ExecuteEvent) -> ListenerResult {
        self.execute.iter().try_for_each(|l| l.execute_completed(event))
    }

    /// Fire `expression_evaluated`
    pub fn expression_evaluated(&self, event: &ExpressionEvaluatedEvent) -> ListenerResult {
        self.verify_rows
            .iter()
            .try_for_each(|l| l.expression_evaluated(event))
    }

    /// Fire `missing_row`
    pub fn missing_row(&self, event: &MissingRowEvent) -> ListenerResult {
        self.verify_rows.iter().try_for_each(|l| l.missing_row(event))
    }

    /// Fire `surplus_row`
    pub fn surplus_row(&self, event: &SurplusRowEvent) -> ListenerResult {
        self.verify_rows.iter().try_for_each(|l| l.surplus_row(event))
    }

    /// Fire `exception_caught`
    pub fn exception_caught(&self, event: &ExceptionEvent) -> ListenerResult {
        self.exception.iter().try_for_each(|l| l.exception_caught(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recording {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl AssertListener for Recording {
        fn success_reported(&self, _event: &AssertSuccessEvent) -> ListenerResult {
            self.log.borrow_mut().push(self.name.to_string());
            if self.fail {
                return Err(ListenerError::new(self.name, "refused"));
            }
            Ok(())
        }
    }

    fn event() -> AssertSuccessEvent {
        AssertSuccessEvent {
            element: Element::new("span"),
        }
    }

    #[test]
    fn test_fires_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ListenerBus::new();
        for name in ["first", "second"] {
            bus.add_assert(Rc::new(Recording {
                name,
                log: Rc::clone(&log),
                fail: false,
            }));
        }
        bus.success_reported(&event()).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn test_first_error_stops_dispatch() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ListenerBus::new();
        bus.add_assert(Rc::new(Recording {
            name: "broken",
            log: Rc::clone(&log),
            fail: true,
        }));
        bus.add_assert(Rc::new(Recording {
            name: "never",
            log: Rc::clone(&log),
            fail: false,
        }));
        let err = bus.success_reported(&event()).unwrap_err();
        assert_eq!(err, ListenerError::new("broken", "refused"));
        assert_eq!(*log.borrow(), vec!["broken"]);
    }

    #[test]
    fn test_default_methods_are_no_ops() {
        struct Quiet;
        impl VerifyRowsListener for Quiet {}
        let mut bus = ListenerBus::new();
        bus.add_verify_rows(Rc::new(Quiet));
        let event = SurplusRowEvent {
            row: Element::new("tr"),
            actual: "x".to_string(),
        };
        assert!(bus.surplus_row(&event).is_ok());
    }
}
