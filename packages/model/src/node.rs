//! # Nodes
//!
//! Immutable document tree. A node is either a branch (typed, with attrs
//! and a content [`Fragment`]) or a text leaf (with a string and marks).
//! Nodes are reference counted; there are no parent pointers, ancestor
//! context comes from [`Node::resolve`].
//!
//! ## Positions
//!
//! A position counts one unit per text character, one per non-text leaf,
//! and one for each side of a branch node. Position 0 is the start of the
//! root's content.

use std::fmt;
use std::sync::Arc;

use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::replace::{self, Slice};
use crate::resolved::ResolvedPos;
use crate::schema::{Attrs, MarkType, NodeType};

struct NodeInner {
    ty: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    size: usize,
}

#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl PartialEq for Node {
    /// Structural equality: same types, attrs, marks, text and content
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.same_markup(other)
                && self.inner.text == other.inner.text
                && self.inner.content == other.inner.content)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marks = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            for mark in &self.inner.marks {
                write!(f, "{:?}(", mark)?;
            }
            Ok(())
        };
        let close = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            for _ in &self.inner.marks {
                write!(f, ")")?;
            }
            Ok(())
        };
        marks(f)?;
        match &self.inner.text {
            Some(text) => write!(f, "{:?}", text)?,
            None => {
                write!(f, "{}", self.inner.ty.name())?;
                if !self.inner.attrs.is_empty() {
                    write!(f, "{:?}", self.inner.attrs)?;
                }
                if !self.inner.content.is_empty() {
                    write!(f, "(")?;
                    for (i, child) in self.inner.content.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{:?}", child)?;
                    }
                    write!(f, ")")?;
                }
            }
        }
        close(f)
    }
}

impl Node {
    pub(crate) fn new_branch(ty: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        let size = if ty.is_leaf() { 1 } else { content.size() + 2 };
        Self {
            inner: Arc::new(NodeInner {
                ty,
                attrs,
                content,
                marks,
                text: None,
                size,
            }),
        }
    }

    pub(crate) fn new_text(ty: NodeType, text: String, marks: Vec<Mark>) -> Self {
        let size = text.chars().count();
        Self {
            inner: Arc::new(NodeInner {
                ty,
                attrs: Attrs::new(),
                content: Fragment::empty(),
                marks,
                text: Some(text),
                size,
            }),
        }
    }

    /// Identity comparison (same allocation)
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn node_type(&self) -> &NodeType {
        &self.inner.ty
    }

    pub fn type_name(&self) -> &str {
        self.inner.ty.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.inner.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&serde_json::Value> {
        self.inner.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.inner.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.inner.marks
    }

    pub fn text(&self) -> Option<&str> {
        self.inner.text.as_deref()
    }

    /// Size in positions, including the node's own boundaries.
    ///
    /// Text counts one position per character. A node with content counts
    /// its content plus two: one for the opening boundary, one for the
    /// closing. Leaf nodes (`image`, `hard_break`, `horizontal_rule`) have
    /// no inside to address, so their two boundaries collapse into a
    /// single position; a cursor can sit before or after them, never
    /// within.
    pub fn node_size(&self) -> usize {
        self.inner.size
    }

    /// Size of the content; for text, its length in characters
    pub fn content_size(&self) -> usize {
        if self.is_text() {
            self.inner.size
        } else {
            self.inner.content.size()
        }
    }

    pub fn child_count(&self) -> usize {
        self.inner.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.inner.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.inner.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.inner.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.inner.content.last_child()
    }

    pub fn is_text(&self) -> bool {
        self.inner.text.is_some()
    }

    pub fn is_inline(&self) -> bool {
        self.inner.ty.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.inner.ty.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.inner.ty.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.inner.ty.inline_content()
    }

    pub fn is_leaf(&self) -> bool {
        self.inner.ty.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.inner.ty.is_atom()
    }

    /// Same type, attrs and marks
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(other.node_type(), other.attrs(), other.marks())
    }

    pub fn has_markup(&self, ty: &NodeType, attrs: &Attrs, marks: &[Mark]) -> bool {
        self.inner.ty == *ty && self.inner.attrs == *attrs && Mark::same_set(&self.inner.marks, marks)
    }

    /// Same markup, new content. Does not validate; callers that build
    /// documents from scratch go through [`NodeType::create`].
    pub fn copy(&self, content: Fragment) -> Node {
        if self.is_text() || content == self.inner.content {
            return self.clone();
        }
        Node::new_branch(
            self.inner.ty.clone(),
            self.inner.attrs.clone(),
            content,
            self.inner.marks.clone(),
        )
    }

    /// Same node with a different mark set
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if Mark::same_set(&marks, &self.inner.marks) {
            return self.clone();
        }
        match &self.inner.text {
            Some(text) => Node::new_text(self.inner.ty.clone(), text.clone(), marks),
            None => Node::new_branch(
                self.inner.ty.clone(),
                self.inner.attrs.clone(),
                self.inner.content.clone(),
                marks,
            ),
        }
    }

    /// Text node with the same marks and different text
    pub fn with_text(&self, text: String) -> Node {
        if self.inner.text.as_deref() == Some(text.as_str()) {
            return self.clone();
        }
        Node::new_text(self.inner.ty.clone(), text, self.inner.marks.clone())
    }

    /// Cut the node to `from..to` of its content (characters for text)
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.inner.text {
            Some(text) => {
                if from == 0 && to >= self.inner.size {
                    return self.clone();
                }
                let piece: String = text.chars().skip(from).take(to.saturating_sub(from)).collect();
                self.with_text(piece)
            }
            None => {
                if from == 0 && to >= self.inner.content.size() {
                    return self.clone();
                }
                self.copy(self.inner.content.cut(from, to))
            }
        }
    }

    /// Open slice of the content between two positions
    pub fn slice(&self, from: usize, to: usize) -> ModelResult<Slice> {
        if from == to {
            return Ok(Slice::empty());
        }
        if from > to {
            return Err(ModelError::invalid_replace(format!("Invalid slice range {}..{}", from, to)));
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to);
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replace `from..to` with a slice. Every rebuilt node is checked
    /// against its content grammar.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> ModelResult<Node> {
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace::replace(&rfrom, &rto, slice)
    }

    pub fn resolve(&self, pos: usize) -> ModelResult<ResolvedPos> {
        ResolvedPos::resolve(self, pos)
    }

    /// Node starting exactly at `pos`, if any
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos).ok()?;
            let child = node.maybe_child(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Depth-first walk over the nodes touching `from..to`, calling
    /// `f(node, pos, parent, index)`. Returning false prunes descent.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    ) {
        self.inner.content.nodes_between(from, to, f, 0, Some(self));
    }

    /// Walk every descendant
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool) {
        self.nodes_between(0, self.content_size(), f);
    }

    /// True only when every inline leaf overlapping `from..to` carries a
    /// mark of `mark_type`. Leaves whose parent does not allow the mark are
    /// skipped. A range without such leaves has no mark.
    pub fn range_has_mark(&self, from: usize, to: usize, mark_type: &MarkType) -> bool {
        let mut found = false;
        let mut all = true;
        self.nodes_between(from, to, &mut |node, pos, parent, _| {
            if !all {
                return false;
            }
            if node.is_inline() {
                if parent.map_or(false, |p| !p.node_type().allows_mark_type(mark_type)) {
                    return false;
                }
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                if end > start {
                    found = true;
                    if mark_type.is_in_set(node.marks()).is_none() {
                        all = false;
                    }
                }
                return false;
            }
            true
        });
        found && all
    }

    /// True when any inline leaf overlapping `from..to` carries the mark
    pub fn range_has_any_mark(&self, from: usize, to: usize, mark_type: &MarkType) -> bool {
        let mut found = false;
        self.nodes_between(from, to, &mut |node, _, _, _| {
            if found {
                return false;
            }
            if node.is_inline() {
                found = mark_type.is_in_set(node.marks()).is_some();
                return false;
            }
            true
        });
        found
    }

    pub fn text_content(&self) -> String {
        match &self.inner.text {
            Some(text) => text.clone(),
            None => self.text_between(0, self.content_size(), "", ""),
        }
    }

    pub fn text_between(&self, from: usize, to: usize, block_separator: &str, leaf_text: &str) -> String {
        self.inner.content.text_between(from, to, block_separator, leaf_text)
    }

    /// Validate the whole subtree: attrs, content grammar, allowed marks
    pub fn check(&self) -> ModelResult<()> {
        if let Some(text) = &self.inner.text {
            if text.is_empty() {
                return Err(ModelError::schema_violation("Empty text node"));
            }
            return Ok(());
        }
        let computed = self.inner.ty.compute_attrs(Some(&self.inner.attrs))?;
        if computed != self.inner.attrs {
            return Err(ModelError::schema_violation(format!(
                "Incomplete attributes on {}",
                self.type_name()
            )));
        }
        self.inner.ty.check_content(&self.inner.content)?;
        for child in self.inner.content.iter() {
            child.check()?;
        }
        Ok(())
    }
}
