//! `echo`: write an evaluated value into the document.

use super::{Command, CommandCall, ExecutionContext};
use crate::result::ConcordantResult;
use crate::value::display_text;

/// Replaces the element's content with the value of its expression.
/// `null`, an unbound `#variable` and a missing property all render as
/// empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoCommand;

impl Command for EchoCommand {
    fn name(&self) -> &str {
        "echo"
    }

    fn execute(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let element = call.element();
        let expression = call.expression();
        ctx.bind_element(element);
        match ctx.evaluator().evaluate(expression) {
            Ok(value) => element.set_text(&display_text(&value)),
            Err(error) if error.is_absent_value() => element.set_text(""),
            Err(error) => ctx.record_exception(element, expression, &error)?,
        }
        Ok(())
    }
}
