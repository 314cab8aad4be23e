//! `set`: bind the element's text to a variable or property.

use super::{Command, CommandCall, ExecutionContext};
use crate::result::ConcordantResult;
use crate::value::{normalise_whitespace, Value};

/// Binds during the execute phase. A missing target is recorded against
/// this element only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetCommand;

impl Command for SetCommand {
    fn name(&self) -> &str {
        "set"
    }

    fn binds_variables(&self) -> bool {
        true
    }

    fn execute(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let text = normalise_whitespace(&call.element().text());
        ctx.bind_element(call.element());
        if let Err(error) = ctx
            .evaluator()
            .evaluate_and_set(call.expression(), Value::String(text))
        {
            ctx.record_exception(call.element(), call.expression(), &error)?;
        }
        Ok(())
    }
}
