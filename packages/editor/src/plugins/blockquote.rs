use std::sync::Arc;

use scribe_model::{NodeSpec, Schema, SchemaSpec};

use crate::command::Command;
use crate::commands;
use crate::errors::EditorResult;
use crate::plugin::{Plugin, ToolbarItem};

pub struct BlockquotePlugin;

impl Plugin for BlockquotePlugin {
    fn name(&self) -> &str {
        "blockquote"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new().node("blockquote", NodeSpec::new().content("block+").group("block"))
    }

    fn commands(&self, schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        Ok(vec![(
            "wrapInBlockquote".to_string(),
            commands::wrap_in(schema.node_type("blockquote")?, None),
        )])
    }

    fn toolbar(&self, schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        let quote = schema.node_type("blockquote")?;
        Ok(vec![ToolbarItem::new("blockquote", "wrapInBlockquote")
            .label("Quote")
            .active(move |state| commands::block_active(state, &quote, None))])
    }

    fn keymap(&self) -> Vec<(String, String)> {
        vec![("Mod-Shift-b".to_string(), "wrapInBlockquote".to_string())]
    }
}
