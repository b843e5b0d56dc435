//! # Views
//!
//! The engine has no rendering of its own. A view is whatever presents
//! the state to a user; commands such as `focus` talk to it through
//! [`EditorView`], and the editor notifies it after every applied
//! transaction.

use crate::state::EditorState;

pub trait EditorView: Send {
    fn focus(&mut self);

    fn blur(&mut self);

    fn has_focus(&self) -> bool;

    /// Called with the new state after each dispatched transaction
    fn update(&mut self, _state: &EditorState) {}
}

/// View without a display, for tests and scripting
#[derive(Debug, Default)]
pub struct HeadlessView {
    focused: bool,
    updates: usize,
}

impl HeadlessView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of states this view has been shown
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl EditorView for HeadlessView {
    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn update(&mut self, _state: &EditorState) {
        self.updates += 1;
    }
}
