//! # Steps
//!
//! The primitive edits a transaction is made of. Applying a step to a
//! document yields the new document plus a [`StepMap`]; applying can fail
//! with a [`ModelError`] when the result would violate the schema, in
//! which case nothing changes.
//!
//! ## Inversion
//!
//! - `Replace` inverts to a replace that puts the removed slice back.
//! - `AddMark` and `RemoveMark` invert to each other over the same range.
//! - Structural steps (`SetBlockType`, `Wrap`) invert through a generic
//!   before/after diff, so new structural kinds need no inversion rules.

use scribe_model::{Attrs, Fragment, Mark, ModelError, ModelResult, Node, NodeType, Slice};

use crate::mapping::StepMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace `from..to` with a slice
    Replace { from: usize, to: usize, slice: Slice },

    /// Add a mark to the inline content in `from..to`
    AddMark { from: usize, to: usize, mark: Mark },

    /// Remove a mark from the inline content in `from..to`
    RemoveMark { from: usize, to: usize, mark: Mark },

    /// Retype every textblock touching `from..to`, keeping its content
    SetBlockType {
        from: usize,
        to: usize,
        node_type: NodeType,
        attrs: Attrs,
    },

    /// Wrap the sibling blocks exactly covering `from..to` in a new node
    Wrap {
        from: usize,
        to: usize,
        wrapper: NodeType,
        attrs: Attrs,
    },
}

/// Outcome of applying a step
#[derive(Debug, Clone)]
pub struct StepResult {
    pub doc: Node,
    pub map: StepMap,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Replace { .. } => "replace",
            Step::AddMark { .. } => "addMark",
            Step::RemoveMark { .. } => "removeMark",
            Step::SetBlockType { .. } => "setBlockType",
            Step::Wrap { .. } => "wrap",
        }
    }

    /// Range the step touches, in the coordinates of the doc it applies to
    pub fn range(&self) -> (usize, usize) {
        match self {
            Step::Replace { from, to, .. }
            | Step::AddMark { from, to, .. }
            | Step::RemoveMark { from, to, .. }
            | Step::SetBlockType { from, to, .. }
            | Step::Wrap { from, to, .. } => (*from, *to),
        }
    }

    pub fn apply(&self, doc: &Node) -> ModelResult<StepResult> {
        match self {
            Step::Replace { from, to, slice } => {
                let result = doc.replace(*from, *to, slice)?;
                Ok(StepResult {
                    doc: result,
                    map: StepMap::new(vec![(*from, to - from, slice.size())]),
                })
            }
            Step::AddMark { from, to, mark } => {
                let doc = map_inline(doc, *from, *to, &|node, parent| {
                    if node.is_atom() && parent.node_type().allows_mark_type(mark.mark_type()) {
                        node.mark(mark.add_to_set(node.marks()))
                    } else {
                        node.clone()
                    }
                })?;
                Ok(StepResult {
                    doc,
                    map: StepMap::empty(),
                })
            }
            Step::RemoveMark { from, to, mark } => {
                let doc = map_inline(doc, *from, *to, &|node, _| node.mark(mark.remove_from_set(node.marks())))?;
                Ok(StepResult {
                    doc,
                    map: StepMap::empty(),
                })
            }
            Step::SetBlockType {
                from,
                to,
                node_type,
                attrs,
            } => {
                let doc = set_block_type(doc, *from, *to, node_type, attrs)?;
                Ok(StepResult {
                    doc,
                    map: StepMap::empty(),
                })
            }
            Step::Wrap {
                from,
                to,
                wrapper,
                attrs,
            } => {
                let doc = wrap(doc, *from, *to, wrapper, attrs)?;
                Ok(StepResult {
                    doc,
                    map: StepMap::new(vec![(*from, 0, 1), (*to, 0, 1)]),
                })
            }
        }
    }

    /// Step that undoes this one. `before` is the document this step was
    /// applied to, `after` the document it produced.
    pub fn invert(&self, before: &Node, after: &Node) -> ModelResult<Step> {
        match self {
            Step::Replace { from, to, slice } => Ok(Step::Replace {
                from: *from,
                to: from + slice.size(),
                slice: before.slice(*from, *to)?,
            }),
            Step::AddMark { from, to, mark } => Ok(Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            }),
            Step::RemoveMark { from, to, mark } => Ok(Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            }),
            Step::SetBlockType { .. } | Step::Wrap { .. } => diff_inverse(before, after),
        }
    }
}

/// Rebuild the slice `from..to`, passing every inline node through `f`
/// with its parent, and put it back in place
fn map_inline(doc: &Node, from: usize, to: usize, f: &dyn Fn(&Node, &Node) -> Node) -> ModelResult<Node> {
    let old = doc.slice(from, to)?;
    let rfrom = doc.resolve(from)?;
    let parent = rfrom.node(rfrom.shared_depth(to)).clone();
    let content = map_fragment(old.content(), f, &parent);
    doc.replace(from, to, &Slice::new(content, old.open_start(), old.open_end()))
}

fn map_fragment(fragment: &Fragment, f: &dyn Fn(&Node, &Node) -> Node, parent: &Node) -> Fragment {
    let mut mapped = Vec::with_capacity(fragment.child_count());
    for child in fragment.iter() {
        let mut child = child.clone();
        if child.content().size() > 0 {
            let inner = map_fragment(child.content(), f, &child);
            child = child.copy(inner);
        }
        if child.is_inline() {
            child = f(&child, parent);
        }
        mapped.push(child);
    }
    Fragment::from_nodes(mapped)
}

fn set_block_type(doc: &Node, from: usize, to: usize, node_type: &NodeType, attrs: &Attrs) -> ModelResult<Node> {
    if !node_type.is_textblock() {
        return Err(ModelError::schema_violation(format!(
            "{} is not a textblock type",
            node_type.name()
        )));
    }
    let mut targets = Vec::new();
    doc.nodes_between(from, to, &mut |node, pos, _, _| {
        if node.is_textblock() {
            if !node.has_markup(node_type, attrs, node.marks()) {
                targets.push((pos, node.clone()));
            }
            return false;
        }
        true
    });

    // retyping keeps sizes, so earlier positions stay valid
    let mut doc = doc.clone();
    for (pos, node) in targets {
        let retyped = node_type.create(Some(attrs.clone()), node.content().clone(), node.marks().to_vec())?;
        doc = doc.replace(pos, pos + node.node_size(), &Slice::closed(retyped))?;
    }
    Ok(doc)
}

fn wrap(doc: &Node, from: usize, to: usize, wrapper: &NodeType, attrs: &Attrs) -> ModelResult<Node> {
    let range = doc.slice(from, to)?;
    if range.open_start() > 0 || range.open_end() > 0 {
        return Err(ModelError::invalid_replace(format!(
            "Wrap range {}..{} does not cover whole nodes",
            from, to
        )));
    }
    let node = wrapper.create(Some(attrs.clone()), range.content().clone(), Vec::new())?;
    doc.replace(from, to, &Slice::closed(node))
}

/// Replace step turning `after` back into `before`, computed from the
/// first and last positions where the two documents differ
fn diff_inverse(before: &Node, after: &Node) -> ModelResult<Step> {
    let Some(start) = after.content().find_diff_start(before.content(), 0) else {
        return Ok(Step::Replace {
            from: 0,
            to: 0,
            slice: Slice::empty(),
        });
    };
    let (mut end_after, mut end_before) = after
        .content()
        .find_diff_end(before.content(), after.content_size(), before.content_size())
        .unwrap_or((after.content_size(), before.content_size()));
    if end_after < start {
        end_before += start - end_after;
        end_after = start;
    }
    if end_before < start {
        end_after += start - end_before;
        end_before = start;
    }

    if let Ok(slice) = before.slice(start, end_before) {
        let candidate = Step::Replace {
            from: start,
            to: end_after,
            slice,
        };
        if let Ok(result) = candidate.apply(after) {
            if result.doc == *before {
                return Ok(candidate);
            }
        }
    }

    // the fine-grained range did not reproduce the old document; swap
    // the whole content, which is valid because `before` was
    Ok(Step::Replace {
        from: 0,
        to: after.content_size(),
        slice: Slice::closed(before.content().clone()),
    })
}
