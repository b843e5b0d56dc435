use std::sync::Arc;

use scribe_model::Schema;

use crate::command::Command;
use crate::commands;
use crate::errors::EditorResult;
use crate::plugin::{Plugin, ToolbarItem};

/// Undo/redo commands. Recording itself is switched on by the editor
/// config, so this only exposes it.
pub struct HistoryPlugin;

impl Plugin for HistoryPlugin {
    fn name(&self) -> &str {
        "history"
    }

    fn commands(&self, _schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        Ok(vec![
            ("undo".to_string(), commands::undo()),
            ("redo".to_string(), commands::redo()),
        ])
    }

    fn toolbar(&self, _schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        Ok(vec![
            ToolbarItem::new("undo", "undo").label("Undo"),
            ToolbarItem::new("redo", "redo").label("Redo"),
        ])
    }

    fn keymap(&self) -> Vec<(String, String)> {
        vec![
            ("Mod-z".to_string(), "undo".to_string()),
            ("Mod-y".to_string(), "redo".to_string()),
            ("Shift-Mod-z".to_string(), "redo".to_string()),
        ]
    }
}
