use std::sync::Arc;

use serde_json::json;

use scribe_model::{AttrSpec, Attrs, NodeSpec, Schema, SchemaSpec};

use crate::command::{from_fn, Command};
use crate::commands::{self, usize_arg};
use crate::errors::{CommandError, EditorResult};
use crate::plugin::{Plugin, ToolbarItem};

pub const MAX_LEVEL: usize = 6;

fn level_attrs(level: usize) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), json!(level));
    attrs
}

/// Headings `h1`..`h6`
pub struct HeadingPlugin;

impl Plugin for HeadingPlugin {
    fn name(&self) -> &str {
        "heading"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new().node(
            "heading",
            NodeSpec::new()
                .content("inline*")
                .group("block")
                .attr("level", AttrSpec::with_default(1)),
        )
    }

    fn commands(&self, schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        let heading = schema.node_type("heading")?;
        // setHeading(level)
        let set_heading = from_fn(move |state, dispatch, _view, args| {
            let level = usize_arg(args, 0)?;
            if !(1..=MAX_LEVEL).contains(&level) {
                return Err(CommandError::invalid_argument(
                    0,
                    format!("heading level must be 1..={}", MAX_LEVEL),
                ));
            }
            commands::apply_block_type(state, dispatch, &heading, Some(level_attrs(level)))
        });
        Ok(vec![("setHeading".to_string(), set_heading)])
    }

    fn toolbar(&self, schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        let heading = schema.node_type("heading")?;
        Ok((1..=3)
            .map(|level| {
                let node_type = heading.clone();
                let attrs = level_attrs(level);
                ToolbarItem::new(&format!("heading{}", level), "setHeading")
                    .label(&format!("Heading {}", level))
                    .args(vec![json!(level)])
                    .active(move |state| commands::block_active(state, &node_type, Some(&attrs)))
            })
            .collect())
    }
}
