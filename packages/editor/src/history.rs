//! # Undo/Redo History
//!
//! Tracks applied transactions as undoable groups.
//!
//! ## Design
//!
//! - Every doc-changing transaction is recorded with the inverses of its
//!   steps, computed against the document each step was applied to
//! - A transaction arriving within `new_group_delay` of the previous one
//!   and touching a range adjacent to it joins the previous group, so a
//!   burst of typing undoes as one unit
//! - New edits clear the redo stack
//! - Undo and redo are transactions tagged with the `history` meta key;
//!   they move a group between the stacks instead of being recorded
//! - The undo stack holds at most `depth` groups; the oldest is dropped
//!
//! History lives inside [`EditorState`] and is replaced, never mutated,
//! when a transaction is applied.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::config::HistoryConfig;
use crate::errors::{EditorError, EditorResult};
use crate::mapping::{Assoc, Mapping};
use crate::selection::Selection;
use crate::state::EditorState;
use crate::step::Step;
use crate::transaction::Transaction;

/// Meta key marking a transaction as an undo/redo replay
pub const HISTORY_META: &str = "history";

/// A group of steps undone/redone together
#[derive(Debug, Clone)]
pub struct HistoryGroup {
    /// Forward steps, in application order
    pub steps: Vec<Step>,

    /// Inverse steps, in the order they must be applied to undo
    pub inverses: Vec<Step>,

    pub selection_before: Selection,

    pub selection_after: Selection,
}

#[derive(Debug, Clone)]
pub struct History {
    config: HistoryConfig,

    /// Undoable groups (most recent last)
    done: VecDeque<Arc<HistoryGroup>>,

    /// Undone groups (most recent last)
    undone: Vec<Arc<HistoryGroup>>,

    /// Time of the last recorded transaction, 0 after a replay
    prev_time: u64,

    /// Ranges the last recorded transaction touched, in its output doc
    prev_ranges: Option<Vec<(usize, usize)>>,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            done: VecDeque::new(),
            undone: Vec::new(),
            prev_time: 0,
            prev_ranges: None,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// History with both stacks emptied
    pub fn cleared(&self) -> History {
        History::new(self.config.clone())
    }

    /// History after `tr` has been applied
    pub(crate) fn apply(&self, tr: &Transaction, selection_before: &Selection, selection_after: &Selection) -> EditorResult<History> {
        let mut next = self.clone();
        match tr.get_meta(HISTORY_META).and_then(|v| v.as_str()) {
            Some("undo") => {
                if let Some(group) = next.done.pop_back() {
                    next.undone.push(group);
                }
                next.reset_grouping();
                return Ok(next);
            }
            Some("redo") => {
                if let Some(group) = next.undone.pop() {
                    next.done.push_back(group);
                }
                next.reset_grouping();
                return Ok(next);
            }
            _ => {}
        }
        if !tr.doc_changed() {
            return Ok(next);
        }

        let mut inverses = Vec::with_capacity(tr.steps().len());
        for (i, step) in tr.steps().iter().enumerate() {
            let before = &tr.docs()[i];
            let after = tr.docs().get(i + 1).unwrap_or_else(|| tr.doc());
            inverses.push(step.invert(before, after).map_err(EditorError::from)?);
        }
        inverses.reverse();

        let new_group = self.prev_time == 0
            || tr.time() > self.prev_time.saturating_add(self.config.new_group_delay)
            || !self.is_adjacent(tr.mapping());

        match next.done.back() {
            Some(last) if !new_group => {
                let mut merged = HistoryGroup::clone(last);
                merged.steps.extend(tr.steps().iter().cloned());
                inverses.extend(merged.inverses);
                merged.inverses = inverses;
                merged.selection_after = *selection_after;
                debug!(steps = merged.steps.len(), "Extended history group");
                if let Some(slot) = next.done.back_mut() {
                    *slot = Arc::new(merged);
                }
            }
            _ => {
                debug!(steps = tr.steps().len(), undo_depth = next.done.len() + 1, "Started history group");
                next.done.push_back(Arc::new(HistoryGroup {
                    steps: tr.steps().to_vec(),
                    inverses,
                    selection_before: *selection_before,
                    selection_after: *selection_after,
                }));
                while next.done.len() > self.config.depth {
                    next.done.pop_front();
                    debug!(depth = self.config.depth, "Evicted oldest history group");
                }
            }
        }

        next.undone.clear();
        next.prev_time = tr.time();
        next.prev_ranges = Some(ranges_for(tr.mapping()));
        Ok(next)
    }

    fn reset_grouping(&mut self) {
        self.prev_time = 0;
        self.prev_ranges = None;
    }

    /// Whether the first step of a transaction touches the ranges of the
    /// previous one
    fn is_adjacent(&self, mapping: &Mapping) -> bool {
        let Some(prev) = &self.prev_ranges else {
            return false;
        };
        let Some(first) = mapping.maps().first() else {
            return true;
        };
        // mark-only steps have empty maps and so never join a group
        let mut adjacent = false;
        first.for_each(|start, end, _, _| {
            if prev.iter().any(|&(from, to)| start <= to && end >= from) {
                adjacent = true;
            }
        });
        adjacent
    }

    fn top_undo(&self) -> Option<&Arc<HistoryGroup>> {
        self.done.back()
    }

    fn top_redo(&self) -> Option<&Arc<HistoryGroup>> {
        self.undone.last()
    }
}

/// Ranges touched by the last position-moving step, in output coordinates
fn ranges_for(mapping: &Mapping) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    for map in mapping.maps().iter().rev() {
        map.for_each(|_, _, from, to| ranges.push((from, to)));
        if !ranges.is_empty() {
            break;
        }
    }
    ranges
}

fn replay(state: &EditorState, steps: &[Step], selection: &Selection, tag: &str) -> EditorResult<Transaction> {
    let mut tr = state.tr();
    for step in steps {
        tr.step(step.clone())?;
    }
    let selection = if selection.validate(tr.doc()).is_ok() {
        *selection
    } else {
        let pos = tr.mapping().map(selection.head(), Assoc::After);
        Selection::near(tr.doc(), pos)
    };
    tr.set_selection(selection)?;
    tr.set_meta(HISTORY_META, tag);
    Ok(tr)
}

/// Transaction undoing the most recent group, if there is one
pub fn undo(state: &EditorState) -> EditorResult<Option<Transaction>> {
    let Some(group) = state.history().and_then(History::top_undo) else {
        return Ok(None);
    };
    replay(state, &group.inverses, &group.selection_before, "undo").map(Some)
}

/// Transaction redoing the most recently undone group, if there is one
pub fn redo(state: &EditorState) -> EditorResult<Option<Transaction>> {
    let Some(group) = state.history().and_then(History::top_redo) else {
        return Ok(None);
    };
    replay(state, &group.steps, &group.selection_after, "redo").map(Some)
}

pub fn undo_depth(state: &EditorState) -> usize {
    state.history().map_or(0, History::undo_depth)
}

pub fn redo_depth(state: &EditorState) -> usize {
    state.history().map_or(0, History::redo_depth)
}
