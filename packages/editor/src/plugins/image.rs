use std::sync::Arc;

use serde_json::{json, Value};

use scribe_model::{AttrSpec, Attrs, NodeSpec, Schema, SchemaSpec};

use crate::command::{from_fn, Command};
use crate::commands::{self, string_arg};
use crate::errors::EditorResult;
use crate::plugin::Plugin;

/// Inline images. Uploading is the host's business; the node only
/// records where the image lives.
pub struct ImagePlugin;

impl Plugin for ImagePlugin {
    fn name(&self) -> &str {
        "image"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new().node(
            "image",
            NodeSpec::new()
                .inline()
                .atom()
                .group("inline")
                .attr("src", AttrSpec::required())
                .attr("alt", AttrSpec::with_default(Value::Null))
                .attr("title", AttrSpec::with_default(Value::Null)),
        )
    }

    fn commands(&self, schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        let image = schema.node_type("image")?;
        // insertImage(src, alt?)
        let insert_image = from_fn(move |state, dispatch, _view, args| {
            let src = string_arg(args, 0)?;
            let mut attrs = Attrs::new();
            attrs.insert("src".to_string(), json!(src));
            if let Some(alt) = args.get(1).and_then(Value::as_str) {
                attrs.insert("alt".to_string(), json!(alt));
            }
            let node = image.create(Some(attrs), scribe_model::Fragment::empty(), Vec::new())?;
            commands::replace_selection(state, dispatch, node)
        });
        Ok(vec![("insertImage".to_string(), insert_image)])
    }
}
