use std::sync::Arc;

use scribe_model::{MarkSpec, Schema, SchemaSpec};

use crate::command::Command;
use crate::commands;
use crate::errors::EditorResult;
use crate::plugin::{Plugin, ToolbarItem};

/// (mark, command, key, label)
const MARKS: [(&str, &str, &str, &str); 4] = [
    ("strong", "toggleBold", "Mod-b", "Bold"),
    ("em", "toggleItalic", "Mod-i", "Italic"),
    ("underline", "toggleUnderline", "Mod-u", "Underline"),
    ("code", "toggleCode", "Mod-e", "Code"),
];

/// Bold, italic, underline and inline code marks
pub struct FormattingPlugin;

impl Plugin for FormattingPlugin {
    fn name(&self) -> &str {
        "formatting"
    }

    fn schema(&self) -> SchemaSpec {
        MARKS.iter().fold(SchemaSpec::new(), |spec, (mark, ..)| {
            // inline code carries no other formatting
            let mark_spec = match *mark {
                "code" => MarkSpec::new().excludes("_"),
                _ => MarkSpec::new(),
            };
            spec.mark(mark, mark_spec)
        })
    }

    fn commands(&self, schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        let mut toggles = Vec::with_capacity(MARKS.len());
        for (mark, command, ..) in MARKS {
            toggles.push((command.to_string(), commands::toggle_mark(schema.mark_type(mark)?, None)));
        }
        Ok(toggles)
    }

    fn toolbar(&self, schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        let mut items = Vec::with_capacity(MARKS.len());
        for (mark, command, _, label) in MARKS {
            let mark_type = schema.mark_type(mark)?;
            items.push(
                ToolbarItem::new(mark, command)
                    .label(label)
                    .active(move |state| commands::mark_active(state, &mark_type)),
            );
        }
        Ok(items)
    }

    fn keymap(&self) -> Vec<(String, String)> {
        MARKS
            .iter()
            .map(|(_, command, key, _)| (key.to_string(), command.to_string()))
            .collect()
    }
}
