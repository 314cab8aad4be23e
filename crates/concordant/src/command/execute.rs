//! `execute`: evaluate an expression for its effect.
//!
//! With child commands, binding children (such as `set`) execute before the
//! expression and the remaining children after it, so values flow into the
//! call and out to assertions. On a `<table>` the header row's commands are
//! applied to every data row, with the expression evaluated once per row.

use super::table::TableLayout;
use super::{run_execute_binding_first, run_phase, run_row, Command, CommandCall, ExecutionContext, Phase};
use crate::document::Element;
use crate::listener::ExecuteEvent;
use crate::result::ConcordantResult;

/// See the module documentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteCommand;

fn is_table(call: &CommandCall) -> bool {
    call.element().is_named("table") && !call.children().is_empty()
}

fn evaluate(call: &CommandCall, element: &Element, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
    if let Some(value) = ctx.evaluate(element, call.expression())? {
        call.capture(value);
    }
    ctx.listeners().execute_completed(&ExecuteEvent {
        element: element.clone(),
        expression: call.expression().to_string(),
    })?;
    Ok(())
}

impl Command for ExecuteCommand {
    fn name(&self) -> &str {
        "execute"
    }

    fn owns_children(&self, call: &CommandCall) -> bool {
        !call.children().is_empty()
    }

    fn setup(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        if is_table(call) {
            return Ok(());
        }
        run_phase(call.children(), Phase::Setup, ctx)
    }

    fn execute(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        if !is_table(call) {
            return run_execute_binding_first(call.children(), ctx, |ctx| {
                evaluate(call, call.element(), ctx)
            });
        }

        let layout = TableLayout::new(call.element(), call.children())?;
        for row in layout.rows() {
            let calls = layout.row_calls(call.children(), row)?;
            run_row(&calls, ctx, |ctx| evaluate(call, row, ctx))?;
        }
        Ok(())
    }

    fn verify(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        if is_table(call) {
            return Ok(());
        }
        run_phase(call.children(), Phase::Verify, ctx)
    }
}
