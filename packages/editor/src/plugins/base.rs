use std::sync::Arc;

use scribe_model::{NodeSpec, Schema, SchemaSpec};

use crate::command::Command;
use crate::commands;
use crate::errors::EditorResult;
use crate::plugin::Plugin;

/// Document skeleton (`doc`, `paragraph`, `text`, `hard_break`) and the
/// commands every editor has
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn name(&self) -> &str {
        "core"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new()
            .node("doc", NodeSpec::new().content("block+"))
            .node("paragraph", NodeSpec::new().content("inline*").group("block"))
            .node("text", NodeSpec::new().group("inline"))
            .node("hard_break", NodeSpec::new().inline().group("inline"))
            .top_node("doc")
    }

    fn commands(&self, _schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        Ok(vec![
            ("selectAll".to_string(), commands::select_all()),
            ("insertText".to_string(), commands::insert_text()),
            ("deleteSelection".to_string(), commands::delete_selection()),
            ("insertHardBreak".to_string(), commands::insert_hard_break()),
            ("focus".to_string(), commands::focus()),
            ("blur".to_string(), commands::blur()),
            ("setParagraph".to_string(), commands::set_paragraph()),
        ])
    }

    fn keymap(&self) -> Vec<(String, String)> {
        vec![
            ("Mod-a".to_string(), "selectAll".to_string()),
            ("Shift-Enter".to_string(), "insertHardBreak".to_string()),
            ("Backspace".to_string(), "deleteSelection".to_string()),
            ("Mod-Alt-0".to_string(), "setParagraph".to_string()),
        ]
    }
}
