use std::sync::Arc;

use scribe_model::{NodeSpec, Schema, SchemaSpec};

use crate::command::{from_fn, Command};
use crate::commands::{self, usize_arg};
use crate::errors::{CommandError, EditorResult};
use crate::plugin::{Plugin, ToolbarItem};

/// Largest table `insertTable` builds in either direction
pub const MAX_TABLE_SIZE: usize = 100;

/// Tables of rows of cells; each cell holds paragraphs
pub struct TablePlugin;

impl Plugin for TablePlugin {
    fn name(&self) -> &str {
        "table"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new()
            .node("table", NodeSpec::new().content("table_row+").group("block"))
            .node("table_row", NodeSpec::new().content("table_cell+"))
            .node("table_cell", NodeSpec::new().content("paragraph+"))
    }

    fn commands(&self, schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        let table = schema.node_type("table")?;
        let row = schema.node_type("table_row")?;
        let cell = schema.node_type("table_cell")?;
        // insertTable(rows, cols)
        let insert_table = from_fn(move |state, dispatch, _view, args| {
            let rows = usize_arg(args, 0)?;
            let cols = usize_arg(args, 1)?;
            for (index, n) in [(0, rows), (1, cols)] {
                if n == 0 || n > MAX_TABLE_SIZE {
                    return Err(CommandError::invalid_argument(
                        index,
                        format!("expected 1..={}", MAX_TABLE_SIZE),
                    ));
                }
            }
            let mut table_rows = Vec::with_capacity(rows);
            for _ in 0..rows {
                let cells = (0..cols)
                    .map(|_| cell.create_and_fill(None))
                    .collect::<Result<Vec<_>, _>>()?;
                table_rows.push(row.create(None, cells, Vec::new())?);
            }
            let node = table.create(None, table_rows, Vec::new())?;
            commands::replace_selection(state, dispatch, node)
        });
        Ok(vec![("insertTable".to_string(), insert_table)])
    }

    fn toolbar(&self, _schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        Ok(vec![ToolbarItem::new("table", "insertTable")
            .label("Table")
            .args(vec![serde_json::json!(3), serde_json::json!(3)])])
    }
}
