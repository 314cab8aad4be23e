//! `verifyRows`: reconcile a produced sequence with the rows of a table.
//!
//! Markup is `prefix:verifyRows="#item : expression"` on a `<table>` whose
//! header row carries the column commands. Rows are matched to items by the
//! text of the first command column, not by position.

use super::table::{cells, TableLayout};
use super::{run_row, Command, CommandCall, ExecutionContext};
use crate::document::Element;
use crate::evaluator::EvaluationError;
use crate::listener::{ExpressionEvaluatedEvent, MissingRowEvent, SurplusRowEvent};
use crate::result::ConcordantResult;
use crate::value::{display_text, normalise_whitespace, Value};

/// See the module documentation.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyRowsCommand;

/// Split `#var : expression`
fn split_binding(expression: &str) -> Result<(&str, &str), EvaluationError> {
    let (variable, sequence) = expression
        .split_once(':')
        .ok_or_else(|| EvaluationError::syntax(expression, "expected '#variable : expression'"))?;
    let variable = variable
        .trim()
        .strip_prefix('#')
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EvaluationError::syntax(expression, "loop variable must start with '#'"))?;
    Ok((variable, sequence.trim()))
}

impl Command for VerifyRowsCommand {
    fn name(&self) -> &str {
        "verifyRows"
    }

    fn owns_children(&self, _call: &CommandCall) -> bool {
        true
    }

    fn execute(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let element = call.element();
        let (_, sequence) = match split_binding(call.expression()) {
            Ok(parts) => parts,
            Err(error) => return ctx.record_exception(element, call.expression(), &error),
        };
        match ctx.evaluate(element, sequence)? {
            Some(Value::Array(items)) => {
                ctx.listeners().expression_evaluated(&ExpressionEvaluatedEvent {
                    element: element.clone(),
                    expression: sequence.to_string(),
                    items: items.clone(),
                })?;
                call.capture(Value::Array(items));
            }
            Some(other) => {
                let error = EvaluationError::type_mismatch(sequence, "array", &other);
                ctx.record_exception(element, sequence, &error)?;
            }
            None => {}
        }
        Ok(())
    }

    fn verify(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let Some(Value::Array(items)) = call.captured() else {
            return Ok(());
        };
        let Ok((variable, _)) = split_binding(call.expression()) else {
            return Ok(());
        };
        let table = call.element();
        let layout = TableLayout::new(table, call.children())?;

        // The key column is the leftmost column carrying a command.
        let mut key: Option<(usize, &CommandCall)> = None;
        for child in call.children() {
            if let Some(column) = layout.column_of(child.element())? {
                match key {
                    Some((k, _)) if k <= column => {}
                    _ => key = Some((column, child)),
                }
            }
        }
        let key_column = key.map_or(0, |(column, _)| column);

        let rows = layout.rows().to_vec();
        let mut matched = vec![false; rows.len()];
        let mut last = rows.last().cloned().unwrap_or_else(|| layout.header().clone());

        for item in items {
            ctx.evaluator().set_variable(variable, item.clone());
            let key_text = match key {
                Some((_, key_call)) => match ctx.evaluate(table, key_call.expression())? {
                    Some(value) => normalise_whitespace(&display_text(&value)),
                    // already recorded as an exception on the table
                    None => continue,
                },
                None => normalise_whitespace(&display_text(&item)),
            };

            let mut found = None;
            for (index, row) in rows.iter().enumerate() {
                if !matched[index] && row_key(row, key_column)? == key_text {
                    found = Some(index);
                    break;
                }
            }

            if let Some(index) = found {
                matched[index] = true;
                let calls = layout.row_calls(call.children(), &rows[index])?;
                run_row(&calls, ctx, |_| Ok(()))?;
            } else {
                let row = layout.append_row(&last)?;
                if let Some(cell) = cells(&row)?.get(key_column) {
                    cell.set_text(&key_text);
                }
                ctx.record_missing_row(&row, &key_text);
                ctx.listeners().missing_row(&MissingRowEvent {
                    row: row.clone(),
                    expected: key_text,
                })?;
                last = row;
            }
        }

        for (row, _) in rows.iter().zip(matched).filter(|(_, m)| !m) {
            let actual = row_key(row, key_column)?;
            ctx.record_surplus_row(row, &actual);
            ctx.listeners().surplus_row(&SurplusRowEvent {
                row: row.clone(),
                actual,
            })?;
        }
        Ok(())
    }
}

fn row_key(row: &Element, column: usize) -> ConcordantResult<String> {
    Ok(cells(row)?
        .get(column)
        .map(|cell| normalise_whitespace(&cell.text()))
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_binding() {
        assert_eq!(split_binding("#row : people").unwrap(), ("row", "people"));
        assert_eq!(split_binding("#r:items()").unwrap(), ("r", "items()"));
        assert!(split_binding("people").is_err());
        assert!(split_binding("row : people").is_err());
        assert!(split_binding("# : people").is_err());
    }
}
