//! # Slices and replacement
//!
//! A [`Slice`] is a fragment cut out of a document, possibly "open" on
//! either side: `open_start` levels of its first nodes are only partially
//! included (a cut through the middle of a paragraph yields a slice that
//! is open by one).
//!
//! [`replace`] is the single structural edit primitive. It substitutes a
//! slice for the range between two resolved positions, joining the
//! slice's open sides onto the surrounding nodes and validating every
//! node it rebuilds.

use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolved::ResolvedPos;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Closed slice holding whole nodes
    pub fn closed(content: impl Into<Fragment>) -> Self {
        Self::new(content.into(), 0, 0)
    }

    /// Slice opened as deep as the fragment's first and last nodes allow
    pub fn max_open(content: Fragment) -> Self {
        let mut open_start = 0;
        let mut node = content.first_child().cloned();
        while let Some(n) = node {
            if n.is_leaf() || n.is_text() {
                break;
            }
            open_start += 1;
            node = n.first_child().cloned();
        }
        let mut open_end = 0;
        let mut node = content.last_child().cloned();
        while let Some(n) = node {
            if n.is_leaf() || n.is_text() {
                break;
            }
            open_end += 1;
            node = n.last_child().cloned();
        }
        Self::new(content, open_start, open_end)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Number of positions the slice occupies when inserted
    pub fn size(&self) -> usize {
        self.content.size().saturating_sub(self.open_start + self.open_end)
    }

    pub fn is_empty(&self) -> bool {
        self.content.size() == 0
    }
}

/// Replace `from..to` in their shared document with `slice`
pub fn replace(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice) -> ModelResult<Node> {
    if slice.open_start > from.depth() {
        return Err(ModelError::invalid_replace(
            "Inserted content deeper than insertion position",
        ));
    }
    if from.depth() - slice.open_start != to.depth().saturating_sub(slice.open_end)
        || slice.open_end > to.depth()
    {
        return Err(ModelError::invalid_replace("Inconsistent open depths"));
    }
    if from.pos() > to.pos() {
        return Err(ModelError::invalid_replace(format!(
            "Replace range {}..{} is reversed",
            from.pos(),
            to.pos()
        )));
    }
    replace_outer(from, to, slice, 0)
}

fn replace_outer(from: &ResolvedPos, to: &ResolvedPos, slice: &Slice, depth: usize) -> ModelResult<Node> {
    let index = from.index(depth);
    let node = from.node(depth);
    if index == to.index(depth) && depth < from.depth() - slice.open_start {
        let inner = replace_outer(from, to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content.size() == 0 {
        close(node, replace_two_way(from, to, depth)?)
    } else if slice.open_start == 0 && slice.open_end == 0 && from.depth() == depth && to.depth() == depth {
        let parent = from.parent();
        let content = parent.content();
        let joined = content
            .cut(0, from.parent_offset())
            .append(&slice.content)
            .append(&content.cut(to.parent_offset(), content.size()));
        close(parent, joined)
    } else {
        let (start, end) = prepare_slice_for_replace(slice, from)?;
        close(node, replace_three_way(from, &start, &end, to, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> ModelResult<()> {
    if sub.node_type().compatible_content(main.node_type()) {
        Ok(())
    } else {
        Err(ModelError::invalid_replace(format!(
            "Cannot join {} onto {}",
            sub.type_name(),
            main.type_name()
        )))
    }
}

fn joinable(before: &ResolvedPos, after: &ResolvedPos, depth: usize) -> ModelResult<Node> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node.clone())
}

/// Push the children of the ancestor at `depth` between `start` and `end`
/// (either side may be open-ended)
fn add_range(start: Option<&ResolvedPos>, end: Option<&ResolvedPos>, depth: usize, target: &mut Vec<Node>) {
    let Some(anchor) = end.or(start) else {
        return;
    };
    let node = anchor.node(depth);
    let mut start_index = 0;
    let end_index = end.map_or(node.child_count(), |end| end.index(depth));
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                target.push(after);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        target.push(node.child(i).clone());
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            if let Some(before) = end.node_before() {
                target.push(before);
            }
        }
    }
}

fn close(node: &Node, content: Fragment) -> ModelResult<Node> {
    node.node_type().check_content(&content)?;
    Ok(node.copy(content))
}

fn replace_three_way(
    from: &ResolvedPos,
    start: &ResolvedPos,
    end: &ResolvedPos,
    to: &ResolvedPos,
    depth: usize,
) -> ModelResult<Fragment> {
    let open_start = if from.depth() > depth {
        Some(joinable(from, start, depth + 1)?)
    } else {
        None
    };
    let open_end = if to.depth() > depth {
        Some(joinable(end, to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    match (&open_start, &open_end) {
        (Some(open_start), Some(open_end)) if start.index(depth) == end.index(depth) => {
            check_join(open_start, open_end)?;
            let inner = replace_three_way(from, start, end, to, depth + 1)?;
            content.push(close(open_start, inner)?);
        }
        _ => {
            if let Some(open_start) = &open_start {
                let inner = replace_two_way(from, start, depth + 1)?;
                content.push(close(open_start, inner)?);
            }
            add_range(Some(start), Some(end), depth, &mut content);
            if let Some(open_end) = &open_end {
                let inner = replace_two_way(end, to, depth + 1)?;
                content.push(close(open_end, inner)?);
            }
        }
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

fn replace_two_way(from: &ResolvedPos, to: &ResolvedPos, depth: usize) -> ModelResult<Fragment> {
    let mut content = Vec::new();
    add_range(None, Some(from), depth, &mut content);
    if from.depth() > depth {
        let node = joinable(from, to, depth + 1)?;
        let inner = replace_two_way(from, to, depth + 1)?;
        content.push(close(&node, inner)?);
    }
    add_range(Some(to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

/// Wrap the slice in copies of the ancestors of `along` so its open
/// sides can be resolved at the same depths as the replaced range
fn prepare_slice_for_replace(slice: &Slice, along: &ResolvedPos) -> ModelResult<(ResolvedPos, ResolvedPos)> {
    let extra = along.depth() - slice.open_start;
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content.clone());
    for depth in (0..extra).rev() {
        node = along.node(depth).copy(Fragment::from_node(node));
    }
    let start = node.resolve(slice.open_start + extra)?;
    let end_pos = node
        .content()
        .size()
        .checked_sub(slice.open_end + extra)
        .ok_or_else(|| ModelError::invalid_replace("Slice open end exceeds its content"))?;
    let end = node.resolve(end_pos)?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_schema::{blockquote, doc, hr, p, text};

    #[test]
    fn test_flat_insert() {
        let d = doc(vec![p(vec![text("hello")])]);
        let slice = Slice::closed(text(" world"));
        let result = d.replace(6, 6, &slice).unwrap();
        assert_eq!(result, doc(vec![p(vec![text("hello world")])]));
    }

    #[test]
    fn test_delete_across_blocks_joins() {
        // <p>ab</p><p>cd</p>, delete from inside the first to inside the second
        let d = doc(vec![p(vec![text("ab")]), p(vec![text("cd")])]);
        let result = d.replace(2, 6, &Slice::empty()).unwrap();
        assert_eq!(result, doc(vec![p(vec![text("ad")])]));
    }

    #[test]
    fn test_open_slice_splits_paragraph() {
        let d = doc(vec![p(vec![text("abcd")])]);
        let source = doc(vec![p(vec![text("x")]), p(vec![text("y")])]);
        let slice = source.slice(2, 5).unwrap();
        assert_eq!((slice.open_start(), slice.open_end()), (1, 1));

        // the slice's closing side carries "y" into the second half
        let result = d.replace(3, 3, &slice).unwrap();
        assert_eq!(result, doc(vec![p(vec![text("ab")]), p(vec![text("ycd")])]));
    }

    #[test]
    fn test_insert_block_between_paragraphs() {
        let d = doc(vec![p(vec![text("a")]), p(vec![text("b")])]);
        let result = d.replace(3, 3, &Slice::closed(hr())).unwrap();
        assert_eq!(result.child_count(), 3);
        assert_eq!(result.child(1).type_name(), "horizontal_rule");
    }

    #[test]
    fn test_invalid_content_is_rejected() {
        let d = doc(vec![p(vec![text("ab")])]);
        let result = d.replace(2, 2, &Slice::closed(p(vec![text("x")])));
        assert!(result.is_err());
    }

    #[test]
    fn test_emptying_doc_violates_schema() {
        let d = doc(vec![p(vec![text("ab")])]);
        assert!(d.replace(0, d.content_size(), &Slice::empty()).is_err());
    }

    #[test]
    fn test_incompatible_join_fails() {
        let d = doc(vec![blockquote(vec![p(vec![text("ab")])]), p(vec![text("cd")])]);
        // from inside the quote's paragraph to inside the plain paragraph
        let result = d.replace(3, 8, &Slice::empty());
        assert!(result.is_err());
    }

    #[test]
    fn test_slice_size() {
        let d = doc(vec![p(vec![text("abc")]), p(vec![text("de")])]);
        let slice = d.slice(2, 7).unwrap();
        assert_eq!(slice.size(), 5);
        assert_eq!(slice.content().child_count(), 2);
    }
}
