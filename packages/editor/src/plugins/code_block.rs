use std::sync::Arc;

use scribe_model::{NodeSpec, Schema, SchemaSpec};

use crate::command::Command;
use crate::commands;
use crate::errors::EditorResult;
use crate::plugin::{Plugin, ToolbarItem};

/// Preformatted blocks. They hold plain text only: no marks, no inline
/// nodes, so converting formatted text into one is refused.
pub struct CodeBlockPlugin;

impl Plugin for CodeBlockPlugin {
    fn name(&self) -> &str {
        "codeBlock"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new().node(
            "code_block",
            NodeSpec::new().content("text*").marks("").group("block").code(),
        )
    }

    fn commands(&self, schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        Ok(vec![(
            "setCodeBlock".to_string(),
            commands::set_block_type(schema.node_type("code_block")?, None),
        )])
    }

    fn toolbar(&self, schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        let code_block = schema.node_type("code_block")?;
        Ok(vec![ToolbarItem::new("codeBlock", "setCodeBlock")
            .label("Code block")
            .active(move |state| commands::block_active(state, &code_block, None))])
    }

    fn keymap(&self) -> Vec<(String, String)> {
        vec![("Mod-Alt-c".to_string(), "setCodeBlock".to_string())]
    }
}
