//! # Selection
//!
//! An anchor/head pair plus the kind of selection it is:
//!
//! - `Text`: a range (or cursor) inside inline content
//! - `Node`: exactly one node, from the position before it to the one after
//! - `All`: the whole document content
//!
//! Selections are plain values; they are only meaningful against the
//! document they were made for and must be mapped through a transaction's
//! [`Mapping`] to survive an edit.

use serde::{Deserialize, Serialize};

use scribe_model::{Node, Slice};

use crate::errors::{EditorError, EditorResult};
use crate::mapping::{Assoc, Mapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    Text,
    Node,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(rename = "type")]
    kind: SelectionKind,
    anchor: usize,
    head: usize,
}

impl Selection {
    pub fn text(anchor: usize, head: usize) -> Self {
        Self {
            kind: SelectionKind::Text,
            anchor,
            head,
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::text(pos, pos)
    }

    /// Select the node starting at `pos`
    pub fn node(doc: &Node, pos: usize) -> EditorResult<Self> {
        let node = doc.node_at(pos).ok_or(EditorError::StalePosition {
            pos,
            size: doc.content_size(),
        })?;
        Ok(Self {
            kind: SelectionKind::Node,
            anchor: pos,
            head: pos + node.node_size(),
        })
    }

    pub fn all(doc: &Node) -> Self {
        Self {
            kind: SelectionKind::All,
            anchor: 0,
            head: doc.content_size(),
        }
    }

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Position of an empty text selection
    pub fn cursor_pos(&self) -> Option<usize> {
        (self.kind == SelectionKind::Text && self.is_empty()).then_some(self.head)
    }

    /// Check that the selection addresses valid positions in `doc`. Both
    /// ends of a text selection must sit inside inline content.
    pub fn validate(&self, doc: &Node) -> EditorResult<()> {
        let size = doc.content_size();
        for pos in [self.anchor, self.head] {
            if pos > size {
                return Err(EditorError::StalePosition { pos, size });
            }
        }
        match self.kind {
            SelectionKind::Text => {
                for pos in [self.anchor, self.head] {
                    if !doc.resolve(pos)?.parent().inline_content() {
                        return Err(EditorError::InvalidSelection { pos });
                    }
                }
                Ok(())
            }
            SelectionKind::Node => match doc.node_at(self.from()) {
                Some(node) if self.from() + node.node_size() == self.to() => Ok(()),
                _ => Err(EditorError::StalePosition {
                    pos: self.from(),
                    size,
                }),
            },
            SelectionKind::All => {
                if self.from() == 0 && self.to() == size {
                    Ok(())
                } else {
                    Err(EditorError::StalePosition { pos: self.to(), size })
                }
            }
        }
    }

    /// Selected content
    pub fn content(&self, doc: &Node) -> EditorResult<Slice> {
        Ok(doc.slice(self.from(), self.to())?)
    }

    /// Carry the selection through `mapping` onto `doc`
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        match self.kind {
            SelectionKind::All => Selection::all(doc),
            SelectionKind::Node => {
                let result = mapping.map_result(self.from(), Assoc::After);
                if !result.deleted {
                    if let Ok(selection) = Selection::node(doc, result.pos) {
                        return selection;
                    }
                }
                Selection::near(doc, result.pos)
            }
            SelectionKind::Text => {
                let anchor = mapping.map(self.anchor, Assoc::After);
                let head = mapping.map(self.head, Assoc::After);
                let in_inline = |pos: usize| {
                    doc.resolve(pos)
                        .map(|r| r.parent().inline_content())
                        .unwrap_or(false)
                };
                if in_inline(anchor) && in_inline(head) {
                    Selection::text(anchor, head)
                } else {
                    Selection::near(doc, head)
                }
            }
        }
    }

    /// A cursor at or near `pos`: `pos` itself when it is in inline
    /// content, else the start of the next textblock, else the end of the
    /// previous one. Documents without textblocks get an `All` selection.
    pub fn near(doc: &Node, pos: usize) -> Selection {
        let pos = pos.min(doc.content_size());
        if let Ok(resolved) = doc.resolve(pos) {
            if resolved.parent().inline_content() {
                return Selection::cursor(pos);
            }
        }
        let mut before = None;
        let mut after = None;
        doc.descendants(&mut |node, node_pos, _, _| {
            if after.is_some() {
                return false;
            }
            if node.is_textblock() {
                let start = node_pos + 1;
                let end = start + node.content_size();
                if start >= pos {
                    after = Some(start);
                } else if end <= pos {
                    before = Some(end);
                }
                return false;
            }
            true
        });
        match after.or(before) {
            Some(pos) => Selection::cursor(pos),
            None => Selection::all(doc),
        }
    }

    pub fn at_start(doc: &Node) -> Selection {
        Selection::near(doc, 0)
    }

    pub fn at_end(doc: &Node) -> Selection {
        let size = doc.content_size();
        let mut last = None;
        doc.descendants(&mut |node, node_pos, _, _| {
            if node.is_textblock() {
                last = Some(node_pos + 1 + node.content_size());
                return false;
            }
            true
        });
        match last {
            Some(pos) => Selection::cursor(pos),
            None => Selection::near(doc, size),
        }
    }
}
