//! Commands and the three-phase call-graph protocol.
//!
//! ```text
//!            ┌──────────┐   ┌──────────┐   ┌──────────┐
//!  graph ───►│  Setup   │──►│ Execute  │──►│  Verify  │
//!            │ pre-order│   │ pre-order│   │post-order│
//!            └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! Each phase is a complete pass over the graph before the next begins. A
//! command that [owns its children](Command::owns_children) drives its
//! subtree itself; the driver does not descend into it.

mod assert_boolean;
mod assert_equals;
mod builder;
mod echo;
mod execute;
mod registry;
mod run;
mod set;
mod table;
mod verify_rows;

pub use assert_boolean::AssertBooleanCommand;
pub use assert_equals::AssertEqualsCommand;
pub use builder::build_call_graph;
pub use echo::EchoCommand;
pub use execute::ExecuteCommand;
pub use registry::{CommandKey, CommandRegistry};
pub use run::RunCommand;
pub use set::SetCommand;
pub use verify_rows::VerifyRowsCommand;

use crate::document::{Document, Element};
use crate::engine::{ProcessContext, SpecificationEngine};
use crate::evaluator::{EvaluationError, Evaluator};
use crate::listener::{AssertFailureEvent, AssertSuccessEvent, ExceptionEvent, ListenerBus};
use crate::recorder::ResultRecorder;
use crate::result::ConcordantResult;
use crate::value::{self, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Namespace URI of the built-in commands
pub const CONCORDANT_NAMESPACE: &str = "urn:concordant:2024";

/// Protocol phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Establish scaffolding before any evaluation
    Setup,
    /// Evaluate and perform effects
    Execute,
    /// Compare and report
    Verify,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Execute => "execute",
            Self::Verify => "verify",
        })
    }
}

/// A unit of behaviour bound to namespaced markup.
///
/// All three phases default to doing nothing. Evaluation problems are
/// recorded through the [`ExecutionContext`]; only listener and structural
/// errors are returned.
pub trait Command {
    /// Name used in logs and call-tree listings
    fn name(&self) -> &str;

    /// Setup phase
    fn setup(&self, _call: &CommandCall, _ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        Ok(())
    }

    /// Execute phase
    fn execute(&self, _call: &CommandCall, _ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        Ok(())
    }

    /// Verify phase
    fn verify(&self, _call: &CommandCall, _ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        Ok(())
    }

    /// Whether this command drives its children's phases itself
    fn owns_children(&self, _call: &CommandCall) -> bool {
        false
    }

    /// Whether this command binds variables that sibling expressions read
    fn binds_variables(&self) -> bool {
        false
    }
}

/// One command occurrence in a document.
pub struct CommandCall {
    id: usize,
    element: Element,
    command: Rc<dyn Command>,
    key: CommandKey,
    expression: String,
    children: Vec<CommandCall>,
    captured: RefCell<Option<Value>>,
}

impl fmt::Debug for CommandCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCall")
            .field("id", &self.id)
            .field("command", &self.command.name())
            .field("element", &self.element)
            .field("expression", &self.expression)
            .field("children", &self.children)
            .finish()
    }
}

impl CommandCall {
    /// Create a call
    #[must_use]
    pub fn new(
        id: usize,
        element: Element,
        command: Rc<dyn Command>,
        key: CommandKey,
        expression: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self {
            id,
            element,
            command,
            key,
            expression: expression.into(),
            children,
            captured: RefCell::new(None),
        }
    }

    /// Pre-order position in the graph
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Element carrying the command
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }

    /// The command implementation
    #[must_use]
    pub fn command(&self) -> &Rc<dyn Command> {
        &self.command
    }

    /// Dispatch key the command was found under
    #[must_use]
    pub const fn key(&self) -> &CommandKey {
        &self.key
    }

    /// Expression text (may be empty)
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Nearest command-bearing descendants
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Store a value computed in one phase for a later one
    pub fn capture(&self, value: Value) {
        *self.captured.borrow_mut() = Some(value);
    }

    /// Value stored by [`capture`](Self::capture)
    #[must_use]
    pub fn captured(&self) -> Option<Value> {
        self.captured.borrow().clone()
    }

    /// Same command and expression bound to another element, without children
    #[must_use]
    pub fn retarget(&self, element: Element) -> Self {
        Self::new(
            self.id,
            element,
            Rc::clone(&self.command),
            self.key.clone(),
            self.expression.clone(),
            Vec::new(),
        )
    }
}

/// The command calls of one document, in document order.
#[derive(Debug, Default)]
pub struct CallGraph {
    roots: Vec<CommandCall>,
}

impl CallGraph {
    /// Wrap root calls
    #[must_use]
    pub fn new(roots: Vec<CommandCall>) -> Self {
        Self { roots }
    }

    /// Top-level calls
    #[must_use]
    pub fn roots(&self) -> &[CommandCall] {
        &self.roots
    }

    /// Total number of calls
    #[must_use]
    pub fn len(&self) -> usize {
        self.walk().len()
    }

    /// Whether the document has no commands
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// All calls in pre-order
    #[must_use]
    pub fn walk(&self) -> Vec<&CommandCall> {
        fn visit<'a>(calls: &'a [CommandCall], out: &mut Vec<&'a CommandCall>) {
            for call in calls {
                out.push(call);
                visit(call.children(), out);
            }
        }
        let mut out = Vec::new();
        visit(&self.roots, &mut out);
        out
    }

    /// Indented listing of the call tree
    #[must_use]
    pub fn render_tree(&self) -> String {
        fn visit(calls: &[CommandCall], depth: usize, out: &mut String) {
            for call in calls {
                out.push_str(&"  ".repeat(depth));
                out.push_str(call.command().name());
                out.push_str(&format!(" <{}>", call.element().qualified_name()));
                if !call.expression().is_empty() {
                    out.push_str(&format!(" \"{}\"", call.expression()));
                }
                out.push('\n');
                visit(call.children(), depth + 1, out);
            }
        }
        let mut out = String::new();
        visit(&self.roots, 0, &mut out);
        out
    }
}

/// Everything a command may touch while it runs.
pub struct ExecutionContext<'a> {
    evaluator: &'a mut dyn Evaluator,
    recorder: &'a mut ResultRecorder,
    listeners: &'a ListenerBus,
    document: &'a Document,
    engine: &'a SpecificationEngine,
    process: &'a ProcessContext,
    fixture_name: &'a str,
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("document", self.document)
            .field("fixture", &self.fixture_name)
            .field("depth", &self.process.depth())
            .finish()
    }
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn new(
        evaluator: &'a mut dyn Evaluator,
        recorder: &'a mut ResultRecorder,
        listeners: &'a ListenerBus,
        document: &'a Document,
        engine: &'a SpecificationEngine,
        process: &'a ProcessContext,
        fixture_name: &'a str,
    ) -> Self {
        Self {
            evaluator,
            recorder,
            listeners,
            document,
            engine,
            process,
            fixture_name,
        }
    }

    /// The bound evaluator
    pub fn evaluator(&mut self) -> &mut dyn Evaluator {
        &mut *self.evaluator
    }

    /// Listener bus of this run
    #[must_use]
    pub const fn listeners(&self) -> &'a ListenerBus {
        self.listeners
    }

    /// Document being processed
    #[must_use]
    pub const fn document(&self) -> &'a Document {
        self.document
    }

    /// Engine running this document
    #[must_use]
    pub const fn engine(&self) -> &'a SpecificationEngine {
        self.engine
    }

    /// Nesting context of this run
    #[must_use]
    pub const fn process(&self) -> &'a ProcessContext {
        self.process
    }

    /// Name of the bound fixture
    #[must_use]
    pub const fn fixture_name(&self) -> &'a str {
        self.fixture_name
    }

    /// Bind `#TEXT` and `#HREF` for `element`.
    pub fn bind_element(&mut self, element: &Element) {
        let text = value::normalise_whitespace(&element.text());
        self.evaluator.set_variable("TEXT", Value::String(text));
        let href = element.attribute("href").map_or(Value::Null, Value::String);
        self.evaluator.set_variable("HREF", href);
    }

    /// Evaluate `expression` for `element`. Evaluation errors are recorded as
    /// exceptions and yield `None`.
    pub fn evaluate(&mut self, element: &Element, expression: &str) -> ConcordantResult<Option<Value>> {
        self.bind_element(element);
        match self.evaluator.evaluate(expression) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                self.record_exception(element, expression, &error)?;
                Ok(None)
            }
        }
    }

    /// Record a passing assertion
    pub fn record_success(&mut self, element: &Element) -> ConcordantResult<()> {
        self.recorder.record_success(element);
        self.listeners.success_reported(&AssertSuccessEvent {
            element: element.clone(),
        })?;
        Ok(())
    }

    /// Record a failed assertion
    pub fn record_failure(&mut self, element: &Element, expected: &str, actual: &str) -> ConcordantResult<()> {
        self.recorder.record_failure(element, expected, actual);
        self.listeners.failure_reported(&AssertFailureEvent {
            element: element.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })?;
        Ok(())
    }

    /// Record an evaluation exception
    pub fn record_exception(
        &mut self,
        element: &Element,
        expression: &str,
        error: &EvaluationError,
    ) -> ConcordantResult<()> {
        warn!(
            expression,
            kind = error.kind(),
            detail = %self.evaluator.describe(expression),
            "evaluation failed: {error}"
        );
        self.recorder.record_exception(element, expression, error);
        self.listeners.exception_caught(&ExceptionEvent {
            element: element.clone(),
            expression: expression.to_string(),
            error: error.clone(),
        })?;
        Ok(())
    }

    /// Record a produced item that matched no row
    pub(crate) fn record_missing_row(&mut self, row: &Element, expected: &str) {
        self.recorder.record_missing_row(row, expected);
    }

    /// Record a row that matched no produced item
    pub(crate) fn record_surplus_row(&mut self, row: &Element, actual: &str) {
        self.recorder.record_surplus_row(row, actual);
    }
}

/// Run one phase over a list of sibling calls in document order.
pub fn run_phase(calls: &[CommandCall], phase: Phase, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
    calls.iter().try_for_each(|call| run_call(call, phase, ctx))
}

/// Run one phase for a call and, unless it owns them, its children.
pub fn run_call(call: &CommandCall, phase: Phase, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
    debug!(%phase, command = call.command().name(), id = call.id(), "running command");
    let owns = call.command().owns_children(call);
    match phase {
        Phase::Setup => {
            call.command().setup(call, ctx)?;
            if !owns {
                run_phase(call.children(), phase, ctx)?;
            }
        }
        Phase::Execute => {
            call.command().execute(call, ctx)?;
            if !owns {
                run_phase(call.children(), phase, ctx)?;
            }
        }
        Phase::Verify => {
            if !owns {
                run_phase(call.children(), phase, ctx)?;
            }
            call.command().verify(call, ctx)?;
        }
    }
    Ok(())
}

/// Run a self-contained group of calls (one table row) through all three
/// phases. In the execute phase binding calls go first, then `between`,
/// then everything else.
pub fn run_row<F>(calls: &[CommandCall], ctx: &mut ExecutionContext<'_>, between: F) -> ConcordantResult<()>
where
    F: FnOnce(&mut ExecutionContext<'_>) -> ConcordantResult<()>,
{
    run_phase(calls, Phase::Setup, ctx)?;
    run_execute_binding_first(calls, ctx, between)?;
    run_phase(calls, Phase::Verify, ctx)
}

/// Execute phase over `calls` with variable-binding calls moved ahead of
/// `between` and the remaining calls after it.
pub fn run_execute_binding_first<F>(
    calls: &[CommandCall],
    ctx: &mut ExecutionContext<'_>,
    between: F,
) -> ConcordantResult<()>
where
    F: FnOnce(&mut ExecutionContext<'_>) -> ConcordantResult<()>,
{
    let (binding, rest): (Vec<&CommandCall>, Vec<&CommandCall>) =
        calls.iter().partition(|c| c.command().binds_variables());
    for call in binding {
        run_call(call, Phase::Execute, ctx)?;
    }
    between(ctx)?;
    for call in rest {
        run_call(call, Phase::Execute, ctx)?;
    }
    Ok(())
}
