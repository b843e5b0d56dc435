//! # Built-in commands
//!
//! The commands every editor gets, plus generic builders plugins use to
//! make their own (`toggle_mark`, `set_block_type`, `wrap_in`,
//! `insert_node`).
//!
//! All of them follow the same shape: build a transaction against the
//! state, report `false` when the builder rejects it, and only hand it to
//! `dispatch` when one was given. Without `dispatch` they are pure
//! feasibility checks.

use std::sync::Arc;

use serde_json::Value;

use scribe_model::{Attrs, Fragment, MarkType, Node, NodeType};

use crate::command::{from_fn, Command, CommandResult};
use crate::errors::CommandError;
use crate::history;
use crate::selection::{Selection, SelectionKind};
use crate::state::EditorState;
use crate::transaction::{MarkMatch, Transaction};

/// Hand `tr` to `dispatch`, if there is one
pub fn finish(tr: Transaction, dispatch: Option<&mut dyn FnMut(Transaction)>) -> CommandResult {
    if let Some(dispatch) = dispatch {
        dispatch(tr);
    }
    Ok(true)
}

pub fn select_all() -> Arc<dyn Command> {
    from_fn(|state, dispatch, _view, _args| {
        let all = Selection::all(state.doc());
        if state.selection() == &all {
            return Ok(false);
        }
        let mut tr = state.tr();
        tr.set_selection(all)?;
        finish(tr, dispatch)
    })
}

/// `insertText(text)`
pub fn insert_text() -> Arc<dyn Command> {
    from_fn(|state, dispatch, _view, args| {
        let text = string_arg(args, 0)?;
        let mut tr = state.tr();
        if tr.insert_text(text).is_err() {
            return Ok(false);
        }
        finish(tr, dispatch)
    })
}

pub fn delete_selection() -> Arc<dyn Command> {
    from_fn(|state, dispatch, _view, _args| {
        if state.selection().is_empty() {
            return Ok(false);
        }
        let mut tr = state.tr();
        if tr.delete_selection().is_err() {
            return Ok(false);
        }
        finish(tr, dispatch)
    })
}

pub fn insert_hard_break() -> Arc<dyn Command> {
    from_fn(|state, dispatch, _view, _args| {
        let Ok(node_type) = state.schema().node_type("hard_break") else {
            return Ok(false);
        };
        let node = node_type.create(None, Fragment::empty(), Vec::new())?;
        let mut tr = state.tr();
        if tr.replace_selection_with(node).is_err() {
            return Ok(false);
        }
        finish(tr, dispatch)
    })
}

pub fn focus() -> Arc<dyn Command> {
    from_fn(|_state, dispatch, view, _args| {
        let Some(view) = view else {
            return Ok(false);
        };
        if dispatch.is_some() {
            view.focus();
        }
        Ok(true)
    })
}

pub fn blur() -> Arc<dyn Command> {
    from_fn(|_state, dispatch, view, _args| {
        let Some(view) = view else {
            return Ok(false);
        };
        if dispatch.is_some() {
            view.blur();
        }
        Ok(true)
    })
}

pub fn undo() -> Arc<dyn Command> {
    from_fn(|state, dispatch, _view, _args| match history::undo(state)? {
        Some(tr) => finish(tr, dispatch),
        None => Ok(false),
    })
}

pub fn redo() -> Arc<dyn Command> {
    from_fn(|state, dispatch, _view, _args| match history::redo(state)? {
        Some(tr) => finish(tr, dispatch),
        None => Ok(false),
    })
}

/// Toggle `mark_type` over the selection. A cursor toggles the stored
/// marks instead, so the next typed text picks the change up.
pub fn toggle_mark(mark_type: MarkType, attrs: Option<Attrs>) -> Arc<dyn Command> {
    from_fn(move |state, dispatch, _view, _args| {
        if !mark_applies(state, &mark_type) {
            return Ok(false);
        }
        let mark = mark_type.create(attrs.clone())?;
        let selection = state.selection();
        let mut tr = state.tr();
        let built = if selection.is_empty() {
            if mark_active(state, &mark_type) {
                tr.remove_stored_mark(&mark_type).map(|_| ())
            } else {
                tr.add_stored_mark(&mark).map(|_| ())
            }
        } else if state.doc().range_has_mark(selection.from(), selection.to(), &mark_type) {
            tr.remove_mark(selection.from(), selection.to(), MarkMatch::Type(mark_type.clone()))
                .map(|_| ())
        } else {
            tr.add_mark(selection.from(), selection.to(), mark).map(|_| ())
        };
        if built.is_err() || (!selection.is_empty() && tr.doc() == state.doc()) {
            return Ok(false);
        }
        finish(tr, dispatch)
    })
}

/// Retype the selected textblocks. The first argument, when it is an
/// object, overrides `attrs`.
pub fn set_block_type(node_type: NodeType, attrs: Option<Attrs>) -> Arc<dyn Command> {
    from_fn(move |state, dispatch, _view, args| {
        let attrs = match args.first() {
            Some(Value::Object(map)) => Some(map.clone().into_iter().collect()),
            _ => attrs.clone(),
        };
        apply_block_type(state, dispatch, &node_type, attrs)
    })
}

/// Shared body of the block type commands
pub fn apply_block_type(
    state: &EditorState,
    dispatch: Option<&mut dyn FnMut(Transaction)>,
    node_type: &NodeType,
    attrs: Option<Attrs>,
) -> CommandResult {
    let selection = state.selection();
    let mut tr = state.tr();
    if tr
        .set_block_type(selection.from(), selection.to(), node_type, attrs)
        .is_err()
        || tr.doc() == state.doc()
    {
        return Ok(false);
    }
    finish(tr, dispatch)
}

pub fn set_paragraph() -> Arc<dyn Command> {
    from_fn(|state, dispatch, _view, _args| {
        let Ok(paragraph) = state.schema().node_type("paragraph") else {
            return Ok(false);
        };
        apply_block_type(state, dispatch, &paragraph, None)
    })
}

pub fn wrap_in(node_type: NodeType, attrs: Option<Attrs>) -> Arc<dyn Command> {
    from_fn(move |state, dispatch, _view, _args| {
        let mut tr = state.tr();
        if tr.wrap_in(&node_type, attrs.clone()).is_err() {
            return Ok(false);
        }
        finish(tr, dispatch)
    })
}

/// Insert a node of `node_type` at the selection, filled with its
/// default content. The first argument, when it is an object, overrides
/// `attrs`.
pub fn insert_node(node_type: NodeType, attrs: Option<Attrs>) -> Arc<dyn Command> {
    from_fn(move |state, dispatch, _view, args| {
        let attrs = match args.first() {
            Some(Value::Object(map)) => Some(map.clone().into_iter().collect()),
            Some(_) => return Err(CommandError::invalid_argument(0, "expected an attrs object")),
            None => attrs.clone(),
        };
        let node = node_type.create_and_fill(attrs)?;
        replace_selection(state, dispatch, node)
    })
}

/// Replace the selection with `node` and dispatch
pub fn replace_selection(
    state: &EditorState,
    dispatch: Option<&mut dyn FnMut(Transaction)>,
    node: Node,
) -> CommandResult {
    let mut tr = state.tr();
    if tr.replace_selection_with(node).is_err() {
        return Ok(false);
    }
    finish(tr, dispatch)
}

/// Whether `mark_type` is active at the selection: in the stored marks
/// or cursor marks for a cursor, over the whole range otherwise
pub fn mark_active(state: &EditorState, mark_type: &MarkType) -> bool {
    let selection = state.selection();
    if selection.is_empty() {
        let marks = match state.stored_marks() {
            Some(marks) => marks.to_vec(),
            None => match state.doc().resolve(selection.head()) {
                Ok(resolved) => resolved.marks(),
                Err(_) => return false,
            },
        };
        return mark_type.is_in_set(&marks).is_some();
    }
    state
        .doc()
        .range_has_mark(selection.from(), selection.to(), mark_type)
}

/// Whether the selection starts inside a `node_type` block whose attrs
/// include `attrs`
pub fn block_active(state: &EditorState, node_type: &NodeType, attrs: Option<&Attrs>) -> bool {
    let Ok(resolved) = state.doc().resolve(state.selection().from()) else {
        return false;
    };
    (0..=resolved.depth()).rev().any(|depth| {
        let node = resolved.node(depth);
        node.node_type() == node_type
            && attrs.map_or(true, |attrs| attrs.iter().all(|(k, v)| node.attr(k) == Some(v)))
    })
}

/// Whether any inline content under the selection can carry the mark
pub fn mark_applies(state: &EditorState, mark_type: &MarkType) -> bool {
    let selection = state.selection();
    if selection.kind() == SelectionKind::Text && selection.is_empty() {
        return state
            .doc()
            .resolve(selection.head())
            .map(|r| r.parent().inline_content() && r.parent().node_type().allows_mark_type(mark_type))
            .unwrap_or(false);
    }
    let mut applies = false;
    state
        .doc()
        .nodes_between(selection.from(), selection.to(), &mut |node, _, _, _| {
            if applies {
                return false;
            }
            if node.inline_content() {
                applies = node.node_type().allows_mark_type(mark_type);
                return false;
            }
            true
        });
    applies
}

pub fn string_arg(args: &[Value], index: usize) -> Result<&str, CommandError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| CommandError::invalid_argument(index, "expected a string"))
}

pub fn usize_arg(args: &[Value], index: usize) -> Result<usize, CommandError> {
    args.get(index)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| CommandError::invalid_argument(index, "expected a non-negative integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{blockquote, doc, heading, p, schema, state_with, strong, text};
    use crate::view::{EditorView, HeadlessView};
    use serde_json::json;

    fn run(command: &Arc<dyn Command>, state: &EditorState, args: &[Value]) -> Option<EditorState> {
        let mut sent = Vec::new();
        let mut dispatch = |tr: Transaction| sent.push(tr);
        let ran = command.run(state, Some(&mut dispatch), None, args).unwrap();
        if !ran {
            return None;
        }
        let tr = sent.pop().unwrap();
        Some(state.apply(tr).unwrap())
    }

    #[test]
    fn test_select_all() {
        let state = state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(1));
        let next = run(&select_all(), &state, &[]).unwrap();
        assert_eq!(next.selection().kind(), SelectionKind::All);
        // already selected: nothing to do
        assert!(run(&select_all(), &next, &[]).is_none());
    }

    #[test]
    fn test_insert_text_requires_string() {
        let state = state_with(doc(vec![p(vec![])]), Selection::cursor(1));
        let err = insert_text().run(&state, None, None, &[json!(5)]).unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument { index: 0, .. }));

        let next = run(&insert_text(), &state, &[json!("hi")]).unwrap();
        assert_eq!(next.doc(), &doc(vec![p(vec![text("hi")])]));
    }

    #[test]
    fn test_delete_selection_needs_range() {
        let state = state_with(doc(vec![p(vec![text("abc")])]), Selection::cursor(2));
        assert!(!delete_selection().run(&state, None, None, &[]).unwrap());

        let state = state_with(doc(vec![p(vec![text("abc")])]), Selection::text(1, 3));
        let next = run(&delete_selection(), &state, &[]).unwrap();
        assert_eq!(next.doc(), &doc(vec![p(vec![text("c")])]));
    }

    #[test]
    fn test_hard_break_inserted_inline() {
        let state = state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(2));
        let next = run(&insert_hard_break(), &state, &[]).unwrap();
        let para = next.doc().child(0);
        assert_eq!(para.child_count(), 3);
        assert_eq!(para.child(1).type_name(), "hard_break");
        assert_eq!(next.selection(), &Selection::cursor(3));
    }

    #[test]
    fn test_focus_needs_view() {
        let state = state_with(doc(vec![p(vec![])]), Selection::cursor(1));
        assert!(!focus().run(&state, None, None, &[]).unwrap());

        let mut view = HeadlessView::new();
        // feasibility check leaves the view alone
        assert!(focus().run(&state, None, Some(&mut view), &[]).unwrap());
        assert!(!view.has_focus());

        let mut dispatch = |_tr: Transaction| {};
        assert!(focus().run(&state, Some(&mut dispatch), Some(&mut view), &[]).unwrap());
        assert!(view.has_focus());
        assert!(blur().run(&state, Some(&mut dispatch), Some(&mut view), &[]).unwrap());
        assert!(!view.has_focus());
    }

    #[test]
    fn test_toggle_mark_on_range() {
        let strong_type = schema().mark_type("strong").unwrap();
        let command = toggle_mark(strong_type.clone(), None);
        let state = state_with(doc(vec![p(vec![text("hello")])]), Selection::text(1, 6));
        let bold = run(&command, &state, &[]).unwrap();
        assert_eq!(bold.doc(), &doc(vec![p(vec![strong(text("hello"))])]));
        assert!(mark_active(&bold, &strong_type));

        let plain = run(&command, &bold, &[]).unwrap();
        assert_eq!(plain.doc(), state.doc());
    }

    #[test]
    fn test_toggle_mark_partial_range_adds() {
        let strong_type = schema().mark_type("strong").unwrap();
        let state = state_with(
            doc(vec![p(vec![strong(text("ab")), text("cd")])]),
            Selection::text(1, 5),
        );
        assert!(!mark_active(&state, &strong_type));
        let next = run(&toggle_mark(strong_type, None), &state, &[]).unwrap();
        assert_eq!(next.doc(), &doc(vec![p(vec![strong(text("abcd"))])]));
    }

    #[test]
    fn test_toggle_mark_at_cursor_sets_stored_marks() {
        let strong_type = schema().mark_type("strong").unwrap();
        let state = state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(3));
        let next = run(&toggle_mark(strong_type.clone(), None), &state, &[]).unwrap();
        assert!(mark_active(&next, &strong_type));
        assert_eq!(next.doc(), state.doc());

        let typed = run(&insert_text(), &next, &[json!("c")]).unwrap();
        assert_eq!(typed.doc(), &doc(vec![p(vec![text("ab"), strong(text("c"))])]));
    }

    #[test]
    fn test_toggle_mark_refused_in_code_block() {
        let schema = schema();
        let code = schema
            .node("code_block", None, vec![text("x")], Vec::new())
            .unwrap();
        let state = state_with(doc(vec![code]), Selection::text(1, 2));
        let command = toggle_mark(schema.mark_type("strong").unwrap(), None);
        assert!(!command.run(&state, None, None, &[]).unwrap());
    }

    #[test]
    fn test_set_block_type_with_args() {
        let heading_type = schema().node_type("heading").unwrap();
        let state = state_with(doc(vec![p(vec![text("Title")])]), Selection::cursor(2));
        let command = set_block_type(heading_type.clone(), None);
        let next = run(&command, &state, &[json!({"level": 3})]).unwrap();
        assert_eq!(next.doc(), &doc(vec![heading(3, vec![text("Title")])]));

        let mut level = Attrs::new();
        level.insert("level".to_string(), json!(3));
        assert!(block_active(&next, &heading_type, Some(&level)));
        // already that type
        assert!(run(&command, &next, &[json!({"level": 3})]).is_none());

        let back = run(&set_paragraph(), &next, &[]).unwrap();
        assert_eq!(back.doc(), state.doc());
    }

    #[test]
    fn test_wrap_in_blockquote() {
        let quote = schema().node_type("blockquote").unwrap();
        let state = state_with(doc(vec![p(vec![text("a")])]), Selection::cursor(1));
        let next = run(&wrap_in(quote.clone(), None), &state, &[]).unwrap();
        assert_eq!(next.doc(), &doc(vec![blockquote(vec![p(vec![text("a")])])]));
        assert!(block_active(&next, &quote, None));
    }

    #[test]
    fn test_insert_node_block() {
        let rule = schema().node_type("horizontal_rule").unwrap();
        let state = state_with(doc(vec![p(vec![text("a")])]), Selection::cursor(2));
        let next = run(&insert_node(rule, None), &state, &[]).unwrap();
        assert_eq!(next.doc().child_count(), 2);
        assert_eq!(next.doc().child(1).type_name(), "horizontal_rule");
    }
}
