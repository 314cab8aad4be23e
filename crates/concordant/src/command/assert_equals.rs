//! `assertEquals`: compare an evaluated value with the element's text.

use super::{Command, CommandCall, ExecutionContext};
use crate::result::ConcordantResult;
use crate::value::{describe, matches_expected, normalise_whitespace};

/// Evaluates in the execute phase and compares in the verify phase, so
/// values bound later in the execute pass are not visible to the comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertEqualsCommand;

impl Command for AssertEqualsCommand {
    fn name(&self) -> &str {
        "assertEquals"
    }

    fn execute(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        if let Some(value) = ctx.evaluate(call.element(), call.expression())? {
            call.capture(value);
        }
        Ok(())
    }

    fn verify(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let Some(actual) = call.captured() else {
            return Ok(());
        };
        let expected = normalise_whitespace(&call.element().text());
        if matches_expected(&actual, &expected) {
            ctx.record_success(call.element())
        } else {
            ctx.record_failure(call.element(), &expected, &describe(&actual))
        }
    }
}
