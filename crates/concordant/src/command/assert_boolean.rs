//! `assertTrue` and `assertFalse`.

use super::{Command, CommandCall, ExecutionContext};
use crate::evaluator::EvaluationError;
use crate::result::ConcordantResult;
use crate::value::Value;

/// Asserts that a boolean expression has the expected value. A non-boolean
/// result is an exception, not a failure.
#[derive(Debug, Clone, Copy)]
pub struct AssertBooleanCommand {
    expected: bool,
}

impl AssertBooleanCommand {
    /// `assertTrue`
    #[must_use]
    pub const fn assert_true() -> Self {
        Self { expected: true }
    }

    /// `assertFalse`
    #[must_use]
    pub const fn assert_false() -> Self {
        Self { expected: false }
    }
}

impl Command for AssertBooleanCommand {
    fn name(&self) -> &str {
        if self.expected {
            "assertTrue"
        } else {
            "assertFalse"
        }
    }

    fn execute(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        match ctx.evaluate(call.element(), call.expression())? {
            Some(value @ Value::Bool(_)) => call.capture(value),
            Some(other) => {
                let error = EvaluationError::type_mismatch(call.expression(), "boolean", &other);
                ctx.record_exception(call.element(), call.expression(), &error)?;
            }
            None => {}
        }
        Ok(())
    }

    fn verify(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let Some(Value::Bool(actual)) = call.captured() else {
            return Ok(());
        };
        if actual == self.expected {
            ctx.record_success(call.element())
        } else {
            ctx.record_failure(
                call.element(),
                &self.expected.to_string(),
                &actual.to_string(),
            )
        }
    }
}
