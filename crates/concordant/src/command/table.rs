//! Table layout shared by the row-driven commands.
//!
//! The header row is the row holding the column commands. Every later row is
//! a data row; a column command is re-targeted to the cell at its column.

use super::CommandCall;
use crate::document::{Element, ElementError};

#[derive(Debug)]
pub(crate) struct TableLayout {
    header: Element,
    rows: Vec<Element>,
}

/// `th`/`td` children of a row
pub(crate) fn cells(row: &Element) -> Result<Vec<Element>, ElementError> {
    Ok(row
        .child_elements()?
        .into_iter()
        .filter(|c| c.is_named("th") || c.is_named("td"))
        .collect())
}

impl TableLayout {
    /// Locate the header row and the data rows following it.
    pub(crate) fn new(table: &Element, calls: &[CommandCall]) -> Result<Self, ElementError> {
        let all: Vec<Element> = table.descendants("tr")?.collect();
        let header_position = match calls.first() {
            Some(call) => all
                .iter()
                .position(|row| is_within(call.element(), row))
                .unwrap_or(0),
            None => 0,
        };
        let header = all
            .get(header_position)
            .cloned()
            .ok_or_else(|| ElementError::Missing {
                name: "tr".to_string(),
            })?;
        let rows = all.into_iter().skip(header_position + 1).collect();
        Ok(Self { header, rows })
    }

    pub(crate) const fn header(&self) -> &Element {
        &self.header
    }

    /// Data rows as found when the layout was taken
    pub(crate) fn rows(&self) -> &[Element] {
        &self.rows
    }

    /// Column index of the header cell containing `element`
    pub(crate) fn column_of(&self, element: &Element) -> Result<Option<usize>, ElementError> {
        let mut current = element.clone();
        loop {
            match current.parent()? {
                Some(parent) if parent == self.header => {
                    return Ok(cells(&self.header)?.iter().position(|c| *c == current));
                }
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
    }

    /// Column commands re-targeted to the cells of `row`. Columns the row
    /// lacks are skipped.
    pub(crate) fn row_calls(&self, calls: &[CommandCall], row: &Element) -> Result<Vec<CommandCall>, ElementError> {
        let row_cells = cells(row)?;
        let mut out = Vec::new();
        for call in calls {
            if let Some(cell) = self
                .column_of(call.element())?
                .and_then(|column| row_cells.get(column))
            {
                out.push(call.retarget(cell.clone()));
            }
        }
        Ok(out)
    }

    /// Append an empty row shaped like the header after `after`.
    pub(crate) fn append_row(&self, after: &Element) -> Result<Element, ElementError> {
        let row = Element::new("tr");
        for _ in cells(&self.header)? {
            row.append_child(&Element::new("td"))?;
        }
        after.insert_after(&row)?;
        Ok(row)
    }
}

fn is_within(element: &Element, ancestor: &Element) -> bool {
    let mut current = Some(element.clone());
    while let Some(node) = current {
        if node == *ancestor {
            return true;
        }
        current = node.parent().ok().flatten();
    }
    false
}
