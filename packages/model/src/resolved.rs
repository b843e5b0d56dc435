//! # Resolved positions
//!
//! A [`ResolvedPos`] turns a flat document position into the chain of
//! ancestors that contain it, with the child index and absolute start
//! offset at every level. Most structural code works on resolved
//! positions rather than raw integers.

use crate::error::{ModelError, ModelResult};
use crate::mark::Mark;
use crate::node::Node;

#[derive(Debug, Clone)]
struct PathEntry {
    node: Node,
    index: usize,
    /// Absolute position of the child at `index`
    offset: usize,
}

#[derive(Debug, Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> ModelResult<Self> {
        if pos > doc.content_size() {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset)?;
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of ancestors below the root
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset into the innermost parent's content
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Absolute start of the content of the ancestor at `depth`
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position just before the ancestor at `depth`; the root has none
    pub fn before(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            return None;
        }
        if depth == self.depth() + 1 {
            return Some(self.pos);
        }
        Some(self.path[depth - 1].offset)
    }

    pub fn after(&self, depth: usize) -> Option<usize> {
        if depth == 0 {
            return None;
        }
        if depth == self.depth() + 1 {
            return Some(self.pos);
        }
        Some(self.path[depth - 1].offset + self.node(depth).node_size())
    }

    /// Offset into the text node the position points into, 0 on a boundary
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let offset = self.text_offset();
        if offset > 0 {
            Some(child.cut(offset, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return parent.maybe_child(index).map(|child| child.cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            parent.maybe_child(index - 1).cloned()
        }
    }

    /// Absolute position of the child at `index` in the ancestor at `depth`
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = self.node(depth);
        let mut pos = self.start(depth);
        for i in 0..index.min(node.child_count()) {
            pos += node.child(i).node_size();
        }
        pos
    }

    /// Marks that text inserted here inherits. Inside text that is the
    /// text's marks; on a boundary the marks of the node before, minus
    /// non-inclusive marks the node after does not share.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let before = if index > 0 { parent.maybe_child(index - 1) } else { None };
        let after = parent.maybe_child(index);
        let (main, other) = match before {
            Some(before) => (Some(before), after),
            None => (after, None),
        };
        let Some(main) = main else {
            return Vec::new();
        };
        main.marks()
            .iter()
            .filter(|mark| {
                mark.mark_type().is_inclusive()
                    || other.map_or(false, |other| mark.is_in_set(other.marks()))
            })
            .cloned()
            .collect()
    }

    /// Marks shared with the position `end` of a range starting here,
    /// used when a deletion keeps the formatting of what it removed.
    pub fn marks_across(&self, end: &ResolvedPos) -> Option<Vec<Mark>> {
        let after = self.parent().maybe_child(self.index(self.depth()))?;
        if !after.is_inline() {
            return None;
        }
        let next = end.parent().maybe_child(end.index(end.depth()));
        Some(
            after
                .marks()
                .iter()
                .filter(|mark| {
                    mark.mark_type().is_inclusive()
                        || next.map_or(false, |next| mark.is_in_set(next.marks()))
                })
                .cloned()
                .collect(),
        )
    }

    /// Deepest depth whose node contains both this position and `pos`
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }

    /// The range of sibling blocks spanning this position and `other`
    pub fn block_range(&self, other: &ResolvedPos) -> Option<NodeRange> {
        self.block_range_where(other, |_| true)
    }

    /// Like [`ResolvedPos::block_range`], but only accepts parents that
    /// satisfy `pred`
    pub fn block_range_where(&self, other: &ResolvedPos, pred: impl Fn(&Node) -> bool) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range_where(self, pred);
        }
        let skip = usize::from(self.parent().inline_content() || self.pos == other.pos);
        if skip > self.depth() {
            return None;
        }
        for depth in (0..=self.depth() - skip).rev() {
            if other.pos <= self.end(depth) && pred(self.node(depth)) {
                return Some(NodeRange::new(self, other, depth));
            }
        }
        None
    }

    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.depth() == other.depth() && self.start(self.depth()) == other.start(other.depth())
    }
}

/// A flat run of siblings inside a common parent
#[derive(Debug, Clone)]
pub struct NodeRange {
    pub start: usize,
    pub end: usize,
    pub depth: usize,
    pub parent: Node,
    pub start_index: usize,
    pub end_index: usize,
}

impl NodeRange {
    fn new(from: &ResolvedPos, to: &ResolvedPos, depth: usize) -> Self {
        Self {
            start: from.before(depth + 1).unwrap_or(0),
            end: to.after(depth + 1).unwrap_or(0),
            depth,
            parent: from.node(depth).clone(),
            start_index: from.index(depth),
            end_index: to.index_after(depth),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_schema::{doc, em, p, text};

    #[test]
    fn test_resolve_path() {
        // <p>ab</p><p>cd</p>
        let d = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
        let pos = d.resolve(2).unwrap();
        assert_eq!(pos.depth(), 1);
        assert_eq!(pos.parent().type_name(), "paragraph");
        assert_eq!(pos.parent_offset(), 1);
        assert_eq!(pos.start(1), 1);
        assert_eq!(pos.end(1), 3);
        assert_eq!(pos.before(1), Some(0));
        assert_eq!(pos.after(1), Some(4));
        assert_eq!(pos.text_offset(), 1);
        assert_eq!(pos.node_before().unwrap().text(), Some("a"));
        assert_eq!(pos.node_after().unwrap().text(), Some("b"));

        let between = d.resolve(4).unwrap();
        assert_eq!(between.depth(), 0);
        assert_eq!(between.index(0), 1);
        assert_eq!(between.before(0), None);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let d = doc(vec![p(vec![text("ab")])]);
        assert!(d.resolve(5).is_err());
        assert!(d.resolve(4).is_ok());
    }

    #[test]
    fn test_marks_at_boundary() {
        let d = doc(vec![p(vec![em(text("ab")), text("cd")])]);
        let inside = d.resolve(2).unwrap();
        assert_eq!(inside.marks().len(), 1);
        // em is inclusive, so the end of the run still carries it
        let after = d.resolve(3).unwrap();
        assert_eq!(after.marks().len(), 1);
        let plain = d.resolve(4).unwrap();
        assert!(plain.marks().is_empty());
    }

    #[test]
    fn test_shared_depth_and_block_range() {
        let d = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
        let from = d.resolve(1).unwrap();
        assert_eq!(from.shared_depth(3), 1);
        assert_eq!(from.shared_depth(6), 0);

        let to = d.resolve(6).unwrap();
        let range = from.block_range(&to).unwrap();
        assert_eq!(range.depth, 0);
        assert_eq!((range.start, range.end), (0, 8));
        assert_eq!((range.start_index, range.end_index), (0, 2));
    }
}
