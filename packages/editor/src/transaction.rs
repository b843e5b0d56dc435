//! # Transactions
//!
//! A [`Transaction`] is obtained from [`EditorState::tr`] and records a
//! sequence of [`Step`]s against that state's document, along with the
//! intermediate documents, the composed [`Mapping`], an optional explicit
//! selection, stored marks and metadata.
//!
//! Builder methods apply their steps immediately so later calls see the
//! current intermediate document. A step that would violate the schema
//! returns an error and leaves the transaction's steps untouched; the
//! failure is also remembered so that dispatching the transaction anyway
//! is rejected as a whole.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::debug;

use scribe_model::{Attrs, Fragment, Mark, MarkType, Node, NodeType, Schema, Slice};

use crate::errors::{EditorError, EditorResult};
use crate::mapping::Mapping;
use crate::selection::{Selection, SelectionKind};
use crate::state::EditorState;
use crate::step::Step;

/// Which marks [`Transaction::remove_mark`] removes
#[derive(Debug, Clone)]
pub enum MarkMatch {
    /// Every mark of this type, whatever its attrs
    Type(MarkType),
    /// Exactly this mark
    Mark(Mark),
    /// All marks
    All,
}

#[derive(Clone)]
pub struct Transaction {
    schema: Schema,
    before: Node,
    base_selection: Selection,
    doc: Node,
    docs: Vec<Node>,
    steps: Vec<Step>,
    mapping: Mapping,
    /// Explicit selection and the number of steps when it was set
    selection: Option<(Selection, usize)>,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    meta: HashMap<String, Value>,
    time: u64,
    failure: Option<String>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("steps", &self.steps)
            .field("selection", &self.selection)
            .field("stored_marks", &self.stored_marks)
            .field("meta", &self.meta)
            .field("time", &self.time)
            .field("failure", &self.failure)
            .finish()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Transaction {
    pub(crate) fn new(state: &EditorState) -> Self {
        Self {
            schema: state.schema().clone(),
            before: state.doc().clone(),
            base_selection: *state.selection(),
            doc: state.doc().clone(),
            docs: Vec::new(),
            steps: Vec::new(),
            mapping: Mapping::new(),
            selection: None,
            stored_marks: state.stored_marks().map(<[Mark]>::to_vec),
            stored_marks_set: false,
            meta: HashMap::new(),
            time: now_millis(),
            failure: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Document the transaction started from
    pub fn before(&self) -> &Node {
        &self.before
    }

    pub(crate) fn base_selection(&self) -> &Selection {
        &self.base_selection
    }

    /// Current (latest intermediate) document
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Document before each step
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn selection_set(&self) -> bool {
        self.selection.is_some()
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    /// Override the timestamp used for history grouping
    pub fn set_time(&mut self, time: u64) -> &mut Self {
        self.time = time;
        self
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    pub(crate) fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// The selection after the steps so far: the explicit one, mapped
    /// through any later steps, or the base selection mapped through all
    pub fn selection(&self) -> Selection {
        match &self.selection {
            Some((selection, at)) if *at == self.steps.len() => *selection,
            Some((selection, at)) => selection.map(&self.doc, &self.mapping.slice(*at)),
            None => self.base_selection.map(&self.doc, &self.mapping),
        }
    }

    /// Apply a step to the current document
    pub fn step(&mut self, step: Step) -> EditorResult<&mut Self> {
        match step.apply(&self.doc) {
            Ok(result) => {
                debug!(step = step.name(), range = ?step.range(), "Applied step");
                self.docs.push(std::mem::replace(&mut self.doc, result.doc));
                self.mapping.append_map(result.map);
                self.steps.push(step);
                self.stored_marks = None;
                Ok(self)
            }
            Err(e) => {
                debug!(step = step.name(), error = %e, "Step rejected");
                if self.failure.is_none() {
                    self.failure = Some(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> EditorResult<&mut Self> {
        if from == to && slice.is_empty() {
            return Ok(self);
        }
        self.step(Step::Replace { from, to, slice })
    }

    pub fn replace_with(&mut self, from: usize, to: usize, content: impl Into<Fragment>) -> EditorResult<&mut Self> {
        self.replace(from, to, Slice::closed(content))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> EditorResult<&mut Self> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> EditorResult<&mut Self> {
        self.replace_with(pos, pos, content)
    }

    /// Type `text` over the selection. The text gets the stored marks, or
    /// the marks at the cursor, and the cursor ends up after it.
    pub fn insert_text(&mut self, text: &str) -> EditorResult<&mut Self> {
        let selection = self.selection();
        if text.is_empty() {
            return self.delete_selection();
        }
        let marks = match &self.stored_marks {
            Some(marks) => marks.clone(),
            None => {
                let from = self.doc.resolve(selection.from())?;
                if selection.is_empty() {
                    from.marks()
                } else {
                    let to = self.doc.resolve(selection.to())?;
                    from.marks_across(&to).unwrap_or_else(|| from.marks())
                }
            }
        };

        if !selection.is_empty() {
            self.delete_selection()?;
        }
        let pos = self.selection().from();
        let resolved = self.doc.resolve(pos)?;
        if !resolved.parent().inline_content() {
            return Err(EditorError::transaction_failed(format!(
                "Cannot insert text at {}: not inside a textblock",
                pos
            )));
        }
        let marks = resolved.parent().node_type().allowed_marks(&marks);
        let node = self.schema.text(text, marks)?;
        let len = node.node_size();
        self.insert(pos, node)?;
        self.set_selection(Selection::cursor(pos + len))
    }

    /// Delete the selected content. Deleting everything leaves the
    /// default content of the top node.
    pub fn delete_selection(&mut self) -> EditorResult<&mut Self> {
        let selection = self.selection();
        if selection.is_empty() {
            return Ok(self);
        }
        let size = self.doc.content_size();
        if selection.kind() == SelectionKind::All || (selection.from() == 0 && selection.to() == size) {
            let filled = self.schema.top_node_type().create_and_fill(None)?;
            self.replace_with(0, size, filled.content().clone())?;
            let selection = Selection::at_start(&self.doc);
            return self.set_selection(selection);
        }
        let from = selection.from();
        self.delete(from, selection.to())?;
        let selection = Selection::near(&self.doc, from);
        self.set_selection(selection)
    }

    /// Replace the selection with a node. Inline nodes go in place; a
    /// block replaces an empty enclosing textblock or is inserted after
    /// the innermost enclosing block that can take it.
    pub fn replace_selection_with(&mut self, node: Node) -> EditorResult<&mut Self> {
        if !self.selection().is_empty() {
            self.delete_selection()?;
        }
        let pos = self.selection().from();
        let resolved = self.doc.resolve(pos)?;
        let size = node.node_size();

        if node.is_inline() {
            if !resolved.parent().inline_content() {
                return Err(EditorError::transaction_failed(format!(
                    "Cannot insert inline {} outside a textblock",
                    node.type_name()
                )));
            }
            self.insert(pos, node)?;
            return self.set_selection(Selection::near(&self.doc, pos + size));
        }

        let mut candidates = Vec::new();
        if resolved.depth() == 0 {
            candidates.push((pos, pos));
        }
        for depth in (1..=resolved.depth()).rev() {
            let (Some(before), Some(after)) = (resolved.before(depth), resolved.after(depth)) else {
                continue;
            };
            let block = resolved.node(depth);
            if depth == resolved.depth() && block.is_textblock() && block.content_size() == 0 {
                candidates.push((before, after));
            }
            candidates.push((after, after));
        }

        for (from, to) in candidates {
            let step = Step::Replace {
                from,
                to,
                slice: Slice::closed(node.clone()),
            };
            if step.apply(&self.doc).is_ok() {
                self.step(step)?;
                return self.set_selection(Selection::near(&self.doc, from + size));
            }
        }
        Err(EditorError::transaction_failed(format!(
            "No valid place to insert {} near {}",
            node.type_name(),
            pos
        )))
    }

    /// Add `mark` to the inline content in `from..to`. Marks the new one
    /// excludes are removed first, each with its own step.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> EditorResult<&mut Self> {
        let mut removed: Vec<(usize, usize, Mark)> = Vec::new();
        let mut added: Vec<(usize, usize)> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, parent, _| {
            if !node.is_inline() {
                return true;
            }
            let allowed = parent.map_or(false, |p| p.node_type().allows_mark_type(mark.mark_type()));
            if !mark.is_in_set(node.marks()) && allowed {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                let new_set = mark.add_to_set(node.marks());
                for existing in node.marks() {
                    if existing.is_in_set(&new_set) {
                        continue;
                    }
                    match removed.last_mut() {
                        Some(last) if last.1 == start && last.2 == *existing => last.1 = end,
                        _ => removed.push((start, end, existing.clone())),
                    }
                }
                match added.last_mut() {
                    Some(last) if last.1 == start => last.1 = end,
                    _ => added.push((start, end)),
                }
            }
            false
        });
        for (from, to, mark) in removed {
            self.step(Step::RemoveMark { from, to, mark })?;
        }
        for (from, to) in added {
            self.step(Step::AddMark {
                from,
                to,
                mark: mark.clone(),
            })?;
        }
        Ok(self)
    }

    /// Remove matching marks from the inline content in `from..to`
    pub fn remove_mark(&mut self, from: usize, to: usize, matching: MarkMatch) -> EditorResult<&mut Self> {
        struct Matched {
            mark: Mark,
            from: usize,
            to: usize,
            step: usize,
        }
        let mut matched: Vec<Matched> = Vec::new();
        let mut step = 0;
        self.doc.nodes_between(from, to, &mut |node, pos, _, _| {
            if !node.is_inline() {
                return true;
            }
            step += 1;
            let to_remove: Vec<Mark> = match &matching {
                MarkMatch::Type(mark_type) => node
                    .marks()
                    .iter()
                    .filter(|m| m.mark_type() == mark_type)
                    .cloned()
                    .collect(),
                MarkMatch::Mark(mark) if mark.is_in_set(node.marks()) => vec![mark.clone()],
                MarkMatch::Mark(_) => Vec::new(),
                MarkMatch::All => node.marks().to_vec(),
            };
            let end = (pos + node.node_size()).min(to);
            for mark in to_remove {
                match matched
                    .iter_mut()
                    .find(|m| m.step + 1 == step && m.mark == mark)
                {
                    Some(found) => {
                        found.to = end;
                        found.step = step;
                    }
                    None => matched.push(Matched {
                        mark,
                        from: pos.max(from),
                        to: end,
                        step,
                    }),
                }
            }
            false
        });
        for m in matched {
            self.step(Step::RemoveMark {
                from: m.from,
                to: m.to,
                mark: m.mark,
            })?;
        }
        Ok(self)
    }

    /// Retype the textblocks touching `from..to`
    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        node_type: &NodeType,
        attrs: Option<Attrs>,
    ) -> EditorResult<&mut Self> {
        let attrs = node_type.compute_attrs(attrs.as_ref())?;
        self.step(Step::SetBlockType {
            from,
            to,
            node_type: node_type.clone(),
            attrs,
        })
    }

    /// Wrap the blocks around the selection in a new `node_type` node
    pub fn wrap_in(&mut self, node_type: &NodeType, attrs: Option<Attrs>) -> EditorResult<&mut Self> {
        let selection = self.selection();
        let from = self.doc.resolve(selection.from())?;
        let to = self.doc.resolve(selection.to())?;
        let range = from.block_range(&to).ok_or_else(|| {
            EditorError::transaction_failed(format!("No block range to wrap in {}", node_type.name()))
        })?;
        let attrs = node_type.compute_attrs(attrs.as_ref())?;
        self.step(Step::Wrap {
            from: range.start,
            to: range.end,
            wrapper: node_type.clone(),
            attrs,
        })
    }

    /// Set the selection; it must be valid in the current document
    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<&mut Self> {
        selection.validate(&self.doc)?;
        self.selection = Some((selection, self.steps.len()));
        self.stored_marks = None;
        Ok(self)
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks.map(Mark::normalize_set);
        self.stored_marks_set = true;
        self
    }

    /// Add a mark to the marks the next typed text will get
    pub fn add_stored_mark(&mut self, mark: &Mark) -> EditorResult<&mut Self> {
        let current = self.current_marks()?;
        Ok(self.set_stored_marks(Some(mark.add_to_set(&current))))
    }

    pub fn remove_stored_mark(&mut self, mark_type: &MarkType) -> EditorResult<&mut Self> {
        let current = self.current_marks()?;
        Ok(self.set_stored_marks(Some(mark_type.remove_from_set(&current))))
    }

    /// Stored marks, or the marks at the selection head
    fn current_marks(&self) -> EditorResult<Vec<Mark>> {
        match &self.stored_marks {
            Some(marks) => Ok(marks.clone()),
            None => Ok(self.doc.resolve(self.selection().head())?.marks()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc, em, heading, p, schema, state_with, strong, text};

    #[test]
    fn test_insert_text_moves_cursor() {
        let state = state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(2));
        let mut tr = state.tr();
        tr.insert_text("XY").unwrap();
        assert_eq!(tr.doc(), &doc(vec![p(vec![text("aXYb")])]));
        assert_eq!(tr.selection(), Selection::cursor(4));
        assert_eq!(tr.docs().len(), 1);
        assert!(tr.doc_changed());
    }

    #[test]
    fn test_insert_text_inherits_marks() {
        let state = state_with(doc(vec![p(vec![strong(text("ab"))])]), Selection::cursor(3));
        let mut tr = state.tr();
        tr.insert_text("c").unwrap();
        assert_eq!(tr.doc(), &doc(vec![p(vec![strong(text("abc"))])]));
    }

    #[test]
    fn test_insert_text_uses_stored_marks() {
        let schema = schema();
        let state = state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(3));
        let mut tr = state.tr();
        tr.add_stored_mark(&schema.mark("em", None).unwrap()).unwrap();
        tr.insert_text("c").unwrap();
        assert_eq!(tr.doc(), &doc(vec![p(vec![text("ab"), em(text("c"))])]));
        // the step cleared the stored marks
        assert!(tr.stored_marks().is_none());
    }

    #[test]
    fn test_failed_step_leaves_transaction_unchanged() {
        let schema = schema();
        let state = state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(1));
        let mut tr = state.tr();
        let paragraph = schema.node("paragraph", None, Vec::<Node>::new(), vec![]).unwrap();
        // a paragraph cannot sit inside a paragraph
        assert!(tr.insert(2, paragraph).is_err());
        assert!(tr.steps().is_empty());
        assert_eq!(tr.doc(), state.doc());
        assert!(tr.failure().is_some());
    }

    #[test]
    fn test_mapping_composes_across_steps() {
        let state = state_with(doc(vec![p(vec![text("abcdef")])]), Selection::cursor(1));
        let mut tr = state.tr();
        tr.insert(1, schema().text("XX", vec![]).unwrap()).unwrap();
        tr.delete(5, 7).unwrap();
        // "f" was at 6 in the base doc: +2 from the insert, -2 from the delete
        assert_eq!(tr.mapping().map(6, crate::mapping::Assoc::After), 6);
        assert_eq!(tr.doc().text_content(), "XXabef");
    }

    #[test]
    fn test_set_selection_checks_current_doc() {
        let state = state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(1));
        let mut tr = state.tr();
        assert!(tr.set_selection(Selection::cursor(6)).is_err());
        tr.insert_text("long text").unwrap();
        assert!(tr.set_selection(Selection::cursor(6)).is_ok());
    }

    #[test]
    fn test_add_mark_replaces_excluded_marks_with_steps() {
        let schema = schema();
        let code = schema.mark("code", None).unwrap();
        let state = state_with(doc(vec![p(vec![strong(text("ab")), text("cd")])]), Selection::cursor(1));
        let mut tr = state.tr();
        tr.add_mark(1, 5, code.clone()).unwrap();
        let names: Vec<&str> = tr.steps().iter().map(Step::name).collect();
        assert_eq!(names, vec!["removeMark", "addMark"]);
        let paragraph = tr.doc().child(0);
        assert_eq!(paragraph.child_count(), 1);
        assert_eq!(paragraph.child(0).marks(), &[code]);
    }

    #[test]
    fn test_remove_mark_by_type() {
        let schema = schema();
        let strong_type = schema.mark_type("strong").unwrap();
        let state = state_with(
            doc(vec![p(vec![strong(text("ab")), em(strong(text("cd")))])]),
            Selection::cursor(1),
        );
        let mut tr = state.tr();
        tr.remove_mark(1, 5, MarkMatch::Type(strong_type)).unwrap();
        assert_eq!(tr.steps().len(), 1);
        assert_eq!(tr.doc(), &doc(vec![p(vec![text("ab"), em(text("cd"))])]));
    }

    #[test]
    fn test_delete_selection_across_blocks() {
        let state = state_with(
            doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]),
            Selection::text(2, 6),
        );
        let mut tr = state.tr();
        tr.delete_selection().unwrap();
        assert_eq!(tr.doc(), &doc(vec![p(vec![text("ad")])]));
        assert_eq!(tr.selection(), Selection::cursor(2));
    }

    #[test]
    fn test_delete_everything_refills() {
        let state = state_with(doc(vec![heading(1, vec![text("T")]), p(vec![text("x")])]), Selection::cursor(1));
        let mut tr = state.tr();
        tr.set_selection(Selection::all(state.doc())).unwrap();
        tr.delete_selection().unwrap();
        assert_eq!(tr.doc(), &doc(vec![p(vec![])]));
        assert_eq!(tr.selection(), Selection::cursor(1));
    }

    #[test]
    fn test_meta_and_time() {
        let state = state_with(doc(vec![p(vec![])]), Selection::cursor(1));
        let mut tr = state.tr();
        tr.set_meta("origin", "test").set_time(42);
        assert_eq!(tr.get_meta("origin"), Some(&Value::from("test")));
        assert_eq!(tr.time(), 42);
        assert!(!tr.doc_changed());
    }
}
