use std::sync::Arc;

use serde_json::{json, Value};

use scribe_model::{AttrSpec, Attrs, MarkSpec, Schema, SchemaSpec};

use crate::command::{from_fn, Command};
use crate::commands::{self, finish, string_arg};
use crate::errors::EditorResult;
use crate::plugin::{Plugin, ToolbarItem};
use crate::transaction::MarkMatch;

/// Hyperlinks. The `link` mark needs an `href` and does not extend to
/// text typed at its end.
pub struct LinkPlugin;

impl Plugin for LinkPlugin {
    fn name(&self) -> &str {
        "link"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new().mark(
            "link",
            MarkSpec::new()
                .attr("href", AttrSpec::required())
                .attr("title", AttrSpec::with_default(Value::Null))
                .inclusive(false),
        )
    }

    fn commands(&self, schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        let link = schema.mark_type("link")?;
        let set_type = link.clone();
        // setLink(href, title?)
        let set_link = from_fn(move |state, dispatch, _view, args| {
            let href = string_arg(args, 0)?;
            let selection = state.selection();
            if selection.is_empty() || !commands::mark_applies(state, &set_type) {
                return Ok(false);
            }
            let mut attrs = Attrs::new();
            attrs.insert("href".to_string(), json!(href));
            if let Some(title) = args.get(1).and_then(Value::as_str) {
                attrs.insert("title".to_string(), json!(title));
            }
            let mark = set_type.create(Some(attrs))?;
            let mut tr = state.tr();
            if tr.add_mark(selection.from(), selection.to(), mark).is_err() {
                return Ok(false);
            }
            finish(tr, dispatch)
        });

        let unset_type = link.clone();
        let unset_link = from_fn(move |state, dispatch, _view, _args| {
            let selection = state.selection();
            if !state
                .doc()
                .range_has_any_mark(selection.from(), selection.to(), &unset_type)
            {
                return Ok(false);
            }
            let mut tr = state.tr();
            if tr
                .remove_mark(selection.from(), selection.to(), MarkMatch::Type(unset_type.clone()))
                .is_err()
            {
                return Ok(false);
            }
            finish(tr, dispatch)
        });

        Ok(vec![
            ("setLink".to_string(), set_link),
            ("unsetLink".to_string(), unset_link),
        ])
    }

    fn toolbar(&self, schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        let link = schema.mark_type("link")?;
        let enabled_type = link.clone();
        Ok(vec![ToolbarItem::new("link", "setLink")
            .label("Link")
            .active(move |state| commands::mark_active(state, &link))
            // the href comes from the view, so only the selection matters
            .enabled(move |state| {
                !state.selection().is_empty() && commands::mark_applies(state, &enabled_type)
            })])
    }

    fn keymap(&self) -> Vec<(String, String)> {
        vec![("Mod-Shift-u".to_string(), "unsetLink".to_string())]
    }
}
