//! # Scribe Editor
//!
//! Transactional editing engine on top of [`scribe_model`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ plugins: schema + commands + toolbar + keys │
//! └─────────────────────────────────────────────┘
//!                     ↓ registered once
//! ┌─────────────────────────────────────────────┐
//! │ Editor                                      │
//! │  - CommandManager: name → command           │
//! │  - PluginRegistry: keymap, toolbar          │
//! │  - current EditorState (swapped wholesale)  │
//! └─────────────────────────────────────────────┘
//!                     ↓ command builds
//! ┌─────────────────────────────────────────────┐
//! │ Transaction: Steps + Mapping + selection    │
//! └─────────────────────────────────────────────┘
//!                     ↓ dispatch validates
//! ┌─────────────────────────────────────────────┐
//! │ next EditorState, History records the edit  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **States are values**: applying a transaction yields a new state;
//!    observers never see a half-applied edit
//! 2. **All or nothing**: a transaction that fails a step, is stale, or
//!    would break the schema is rejected as a whole
//! 3. **Commands can be asked first**: without a dispatch function a
//!    command is a side-effect free feasibility check
//! 4. **Failures stay local**: a broken command returns `false`; only
//!    plugin conflicts at construction are fatal
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_editor::EditorBuilder;
//! use serde_json::json;
//!
//! let mut editor = EditorBuilder::new().default_plugins().build()?;
//! editor.execute("insertText", &[json!("Hello")]);
//! editor.execute("selectAll", &[]);
//! editor.execute("toggleBold", &[]);
//! assert!(editor.undo()?);
//! ```

mod command;
pub mod commands;
mod config;
mod editor;
mod errors;
pub mod history;
mod mapping;
mod plugin;
pub mod plugins;
mod selection;
mod state;
mod step;
mod transaction;
mod view;

#[cfg(test)]
mod test_support;

pub use command::{from_fn, Command, CommandManager, CommandResult};
pub use config::{EditorConfig, HistoryConfig};
pub use editor::{Editor, EditorBuilder, Listener, ListenerId, USER_PLUGIN};
pub use errors::{CommandError, EditorError, EditorResult};
pub use history::{History, HistoryGroup, HISTORY_META};
pub use mapping::{Assoc, MapResult, Mapping, StepMap};
pub use plugin::{normalize_key, Plugin, PluginRegistry, Registration, StatePredicate, ToolbarItem, ToolbarState};
pub use selection::{Selection, SelectionKind};
pub use state::EditorState;
pub use step::{Step, StepResult};
pub use transaction::{MarkMatch, Transaction};
pub use view::{EditorView, HeadlessView};

// Re-export the model so plugin authors need a single dependency
pub use scribe_model;
