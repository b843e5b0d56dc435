//! # Fragments
//!
//! Ordered, immutable sibling sequences with a cached size. Operations
//! return new fragments that reuse the untouched child nodes (children are
//! reference counted, so a clone never copies a subtree).

use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::node::Node;

#[derive(Clone, Default, PartialEq)]
pub struct Fragment {
    nodes: Vec<Node>,
    size: usize,
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Fragment::from_node(node)
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}

impl From<Option<Node>> for Fragment {
    fn from(node: Option<Node>) -> Self {
        node.map(Fragment::from_node).unwrap_or_default()
    }
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_node(node: Node) -> Self {
        Self::from_nodes(vec![node])
    }

    /// Build a fragment, joining adjacent text nodes with equal marks and
    /// dropping empty text nodes.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut joined: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.is_text() && node.node_size() == 0 {
                continue;
            }
            if let Some(last) = joined.last_mut() {
                if last.is_text() && node.is_text() && last.same_markup(&node) {
                    let merged = format!("{}{}", last.text().unwrap_or_default(), node.text().unwrap_or_default());
                    *last = last.with_text(merged);
                    continue;
                }
            }
            joined.push(node);
        }
        let size = joined.iter().map(Node::node_size).sum();
        Self { nodes: joined, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child at `index`; panics when out of bounds like slice indexing
    pub fn child(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut nodes = self.nodes.clone();
        nodes.extend(other.nodes.iter().cloned());
        Fragment::from_nodes(nodes)
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.push(node);
        nodes.extend(self.nodes.iter().cloned());
        Fragment::from_nodes(nodes)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        Fragment::from_nodes(nodes)
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.nodes.clone();
        nodes[index] = node;
        Fragment::from_nodes(nodes)
    }

    /// Cut out the part between two positions (relative to the fragment
    /// start). Children overlapping a boundary are cut as well.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        if to > from {
            let mut pos = 0;
            for child in &self.nodes {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let piece = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to.saturating_sub(pos + 1)).min(child.content_size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    result.push(piece);
                }
                pos = end;
            }
        }
        Fragment::from_nodes(result)
    }

    /// Index of the child at `pos` and that child's start offset. A
    /// position on a child boundary resolves to the following child.
    pub fn find_index(&self, pos: usize) -> ModelResult<(usize, usize)> {
        if pos == 0 {
            return Ok((0, 0));
        }
        if pos == self.size {
            return Ok((self.nodes.len(), pos));
        }
        if pos > self.size {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: self.size,
            });
        }
        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return Ok((i + 1, end));
                }
                return Ok((i, cur));
            }
            cur = end;
        }
        Err(ModelError::PositionOutOfRange {
            pos,
            size: self.size,
        })
    }

    /// Depth-first walk over the nodes touching `from..to`. Returning
    /// false from the visitor skips that node's children.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
        node_start: usize,
        parent: Option<&Node>,
    ) {
        let mut pos = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from {
                if f(child, node_start + pos, parent, i) && child.content_size() > 0 {
                    let start = pos + 1;
                    child.content().nodes_between(
                        from.saturating_sub(start),
                        to.saturating_sub(start).min(child.content_size()),
                        f,
                        node_start + start,
                        Some(child),
                    );
                }
            }
            pos = end;
        }
    }

    /// Concatenated text of the range, with `block_separator` between
    /// block nodes and `leaf_text` standing in for non-text leaves.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str, leaf_text: &str) -> String {
        let mut text = String::new();
        let mut first = true;
        self.nodes_between(
            from,
            to,
            &mut |node, pos, _, _| {
                if let Some(t) = node.text() {
                    let start = from.saturating_sub(pos);
                    let end = (to - pos).min(node.node_size());
                    text.extend(t.chars().skip(start).take(end.saturating_sub(start)));
                    first = false;
                } else if node.is_leaf() {
                    if node.is_inline() {
                        text.push_str(leaf_text);
                    }
                    first = false;
                } else if !first && node.is_block() {
                    text.push_str(block_separator);
                    first = true;
                }
                true
            },
            0,
            None,
        );
        text
    }

    /// First position where this fragment and `other` differ, if any
    pub fn find_diff_start(&self, other: &Fragment, pos: usize) -> Option<usize> {
        let mut pos = pos;
        let mut i = 0;
        loop {
            if i == self.child_count() || i == other.child_count() {
                return if self.child_count() == other.child_count() {
                    None
                } else {
                    Some(pos)
                };
            }
            let a = self.child(i);
            let b = other.child(i);
            if a.ptr_eq(b) || a == b {
                pos += a.node_size();
                i += 1;
                continue;
            }
            if !a.same_markup(b) {
                return Some(pos);
            }
            if let (Some(ta), Some(tb)) = (a.text(), b.text()) {
                let common = ta.chars().zip(tb.chars()).take_while(|(x, y)| x == y).count();
                return Some(pos + common);
            }
            if a.content_size() > 0 || b.content_size() > 0 {
                if let Some(inner) = a.content().find_diff_start(b.content(), pos + 1) {
                    return Some(inner);
                }
            }
            pos += a.node_size();
            i += 1;
        }
    }

    /// Last positions (in this fragment and in `other`) where the two
    /// differ, scanning from the end
    pub fn find_diff_end(&self, other: &Fragment, pos_a: usize, pos_b: usize) -> Option<(usize, usize)> {
        let mut pos_a = pos_a;
        let mut pos_b = pos_b;
        let mut ia = self.child_count();
        let mut ib = other.child_count();
        loop {
            if ia == 0 || ib == 0 {
                return if ia == ib { None } else { Some((pos_a, pos_b)) };
            }
            ia -= 1;
            ib -= 1;
            let a = self.child(ia);
            let b = other.child(ib);
            let size = a.node_size();
            if a.ptr_eq(b) || a == b {
                pos_a -= size;
                pos_b -= size;
                continue;
            }
            if !a.same_markup(b) {
                return Some((pos_a, pos_b));
            }
            if let (Some(ta), Some(tb)) = (a.text(), b.text()) {
                let common = ta
                    .chars()
                    .rev()
                    .zip(tb.chars().rev())
                    .take_while(|(x, y)| x == y)
                    .count()
                    .min(a.node_size().min(b.node_size()));
                return Some((pos_a - common, pos_b - common));
            }
            if a.content_size() > 0 || b.content_size() > 0 {
                if let Some(inner) = a.content().find_diff_end(b.content(), pos_a - 1, pos_b - 1) {
                    return Some(inner);
                }
            }
            pos_a -= size;
            pos_b -= b.node_size();
        }
    }
}
