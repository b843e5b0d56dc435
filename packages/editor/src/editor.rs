//! # Editor
//!
//! The editor owns the single current [`EditorState`] together with the
//! command table, the registered plugins and an optional view. It is the
//! only place where state is swapped: [`Editor::dispatch`] applies a
//! transaction and replaces the state wholesale, or rejects it and keeps
//! the old one.
//!
//! Dispatch takes `&mut self`, so a command cannot re-enter it while it
//! runs; transactions a command hands over are queued and applied once
//! the command has returned.
//!
//! ```rust,ignore
//! let mut editor = EditorBuilder::new().default_plugins().build()?;
//! editor.execute("insertText", &[json!("Hello")]);
//! editor.execute("selectAll", &[]);
//! editor.execute("toggleBold", &[]);
//! editor.undo()?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use scribe_model::{Node, Schema};

use crate::command::{Command, CommandManager};
use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::history;
use crate::plugin::{Plugin, PluginRegistry, Registration, ToolbarState};
use crate::plugins::{self, CorePlugin};
use crate::selection::Selection;
use crate::state::EditorState;
use crate::transaction::Transaction;
use crate::view::EditorView;

/// Plugin name commands registered after construction are filed under
pub const USER_PLUGIN: &str = "user";

pub type Listener = Box<dyn FnMut(&EditorState) + Send>;

/// Handle returned by [`Editor::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub struct EditorBuilder {
    config: EditorConfig,
    plugins: Vec<Arc<dyn Plugin>>,
    doc: Option<Value>,
    view: Option<Box<dyn EditorView>>,
}

impl Default for EditorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorBuilder {
    pub fn new() -> Self {
        Self {
            config: EditorConfig::default(),
            plugins: Vec::new(),
            doc: None,
            view: None,
        }
    }

    pub fn config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    pub fn plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Add every built-in plugin
    pub fn default_plugins(self) -> Self {
        self.plugins(plugins::default_plugins())
    }

    /// Initial document, as JSON
    pub fn doc_json(mut self, doc: Value) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn view(mut self, view: impl EditorView + 'static) -> Self {
        self.view = Some(Box::new(view));
        self
    }

    /// Register the plugins and build the initial state. The core plugin
    /// always comes first. Fails on any plugin conflict or an invalid
    /// initial document.
    #[instrument(skip(self), fields(plugins = self.plugins.len() + 1))]
    pub fn build(self) -> EditorResult<Editor> {
        let mut all: Vec<Arc<dyn Plugin>> = vec![Arc::new(CorePlugin)];
        all.extend(self.plugins);

        let Registration {
            schema,
            commands,
            registry,
        } = PluginRegistry::register(all, CommandManager::new()).map_err(|e| {
            error!(error = %e, "Plugin registration failed");
            e
        })?;

        let doc = match &self.doc {
            Some(value) => Some(Node::from_json(&schema, value)?),
            None => None,
        };
        let mut state = EditorState::create(schema, doc, None)?;
        if self.config.enable_history {
            state = state.with_history(self.config.history.clone());
        }

        info!(
            plugins = ?registry.plugin_names(),
            commands = commands.names().len(),
            history = self.config.enable_history,
            "Editor ready"
        );
        Ok(Editor {
            state,
            commands,
            registry,
            view: self.view,
            listeners: Vec::new(),
            next_listener: 0,
            config: self.config,
        })
    }
}

pub struct Editor {
    state: EditorState,
    commands: CommandManager,
    registry: PluginRegistry,
    view: Option<Box<dyn EditorView>>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    config: EditorConfig,
}

impl Editor {
    pub fn builder() -> EditorBuilder {
        EditorBuilder::new()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn schema(&self) -> &Schema {
        self.state.schema()
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn commands(&self) -> &CommandManager {
        &self.commands
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn view(&self) -> Option<&dyn EditorView> {
        self.view.as_deref()
    }

    pub fn set_view(&mut self, view: impl EditorView + 'static) {
        let mut view: Box<dyn EditorView> = Box::new(view);
        view.update(&self.state);
        self.view = Some(view);
    }

    /// Start a transaction against the current state
    pub fn tr(&self) -> Transaction {
        self.state.tr()
    }

    /// Apply a transaction. On success the state is replaced and the view
    /// and listeners are notified; on failure nothing changes.
    #[instrument(skip(self, tr), fields(steps = tr.steps().len()))]
    pub fn dispatch(&mut self, tr: Transaction) -> EditorResult<()> {
        match self.state.apply(tr) {
            Ok(next) => {
                self.commit(next);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Transaction rejected");
                Err(e)
            }
        }
    }

    fn commit(&mut self, next: EditorState) {
        self.state = next;
        if let Some(view) = self.view.as_mut() {
            view.update(&self.state);
        }
        for (_, listener) in self.listeners.iter_mut() {
            listener(&self.state);
        }
    }

    /// Run a command and dispatch what it produces. Everything the command
    /// dispatched is applied as a unit: if any transaction is rejected the
    /// state stays as it was before the command ran.
    pub fn try_execute(&mut self, name: &str, args: &[Value]) -> EditorResult<bool> {
        let mut queued = Vec::new();
        let ran = {
            let mut push = |tr: Transaction| queued.push(tr);
            let dispatch: &mut dyn FnMut(Transaction) = &mut push;
            let view = self.view.as_mut().map(|v| v.as_mut() as &mut dyn EditorView);
            self.commands.try_execute(name, &self.state, Some(dispatch), view, args)?
        };

        let mut next: Option<EditorState> = None;
        for tr in queued {
            let base = next.as_ref().unwrap_or(&self.state);
            let applied = base.apply(tr).map_err(|e| {
                warn!(command = name, error = %e, "Transaction rejected");
                e
            })?;
            next = Some(applied);
        }
        if let Some(next) = next {
            self.commit(next);
        }
        Ok(ran)
    }

    /// Run a command. Unknown commands, failing commands and rejected
    /// transactions are logged and reported as `false`.
    pub fn execute(&mut self, name: &str, args: &[Value]) -> bool {
        match self.try_execute(name, args) {
            Ok(ran) => ran,
            Err(e @ EditorError::UnknownCommand(_)) => {
                warn!(command = name, error = %e, "Command lookup failed");
                false
            }
            Err(e) => {
                error!(command = name, error = %e, "Command failed");
                false
            }
        }
    }

    /// Whether a command could run now. Nothing is dispatched.
    pub fn can(&mut self, name: &str, args: &[Value]) -> bool {
        let view = self.view.as_mut().map(|v| v.as_mut() as &mut dyn EditorView);
        self.commands
            .try_execute(name, &self.state, None, view, args)
            .unwrap_or(false)
    }

    pub fn undo(&mut self) -> EditorResult<bool> {
        match history::undo(&self.state)? {
            Some(tr) => self.dispatch(tr).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        match history::redo(&self.state)? {
            Some(tr) => self.dispatch(tr).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn undo_depth(&self) -> usize {
        history::undo_depth(&self.state)
    }

    pub fn redo_depth(&self) -> usize {
        history::redo_depth(&self.state)
    }

    /// Forget all undo/redo history
    pub fn clear_history(&mut self) {
        if let Some(history) = self.state.history() {
            let cleared = history.cleared();
            self.state = self.state.replace_history(cleared);
        }
    }

    /// Evaluate every toolbar item against the current state
    pub fn toolbar_states(&self) -> Vec<ToolbarState> {
        self.registry
            .toolbar()
            .iter()
            .map(|item| item.state(&self.state, &self.commands))
            .collect()
    }

    pub fn command_for_key(&self, key: &str) -> Option<&str> {
        self.registry.command_for_key(key)
    }

    /// Run the command bound to `key`, if any
    pub fn handle_key(&mut self, key: &str) -> bool {
        match self.registry.command_for_key(key) {
            Some(command) => {
                let command = command.to_string();
                self.execute(&command, &[])
            }
            None => false,
        }
    }

    /// Call `listener` with the new state after every applied transaction
    pub fn subscribe(&mut self, listener: impl FnMut(&EditorState) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Add a command after construction. Names still have to be unique.
    pub fn register_command(&mut self, name: &str, command: Arc<dyn Command>) -> EditorResult<()> {
        self.commands.register(name, command, USER_PLUGIN)
    }

    /// Replace the whole document content, as one undoable edit
    pub fn set_content(&mut self, doc: &Value) -> EditorResult<()> {
        let doc = Node::from_json(self.state.schema(), doc)?;
        let mut tr = self.state.tr();
        let size = tr.doc().content_size();
        tr.replace_with(0, size, doc.content().clone())?;
        let selection = Selection::at_start(tr.doc());
        tr.set_selection(selection)?;
        self.dispatch(tr)
    }

    pub fn to_json(&self) -> Value {
        self.state.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::HeadlessView;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn editor() -> Editor {
        EditorBuilder::new().default_plugins().build().unwrap()
    }

    #[test]
    fn test_build_defaults() {
        let editor = editor();
        assert_eq!(editor.doc().to_json(), json!({"type": "doc", "content": [{"type": "paragraph"}]}));
        assert_eq!(editor.selection(), &Selection::cursor(1));
        assert!(editor.commands().contains("toggleBold"));
        assert!(editor.plugins().has_plugin("core"));
    }

    #[test]
    fn test_execute_and_undo() {
        let mut editor = editor();
        assert!(editor.execute("insertText", &[json!("Hello")]));
        assert_eq!(editor.doc().text_content(), "Hello");
        assert_eq!(editor.undo_depth(), 1);

        assert!(editor.undo().unwrap());
        assert_eq!(editor.doc().text_content(), "");
        assert!(editor.redo().unwrap());
        assert_eq!(editor.doc().text_content(), "Hello");
    }

    #[test]
    fn test_unknown_command_is_false() {
        let mut editor = editor();
        assert!(!editor.execute("explode", &[]));
        assert!(!editor.can("explode", &[]));
        assert_eq!(
            editor.try_execute("explode", &[]),
            Err(EditorError::UnknownCommand("explode".to_string()))
        );
    }

    #[test]
    fn test_command_dispatches_are_all_or_nothing() {
        let mut editor = editor();
        let twice = crate::command::from_fn(|state, dispatch, _view, _args| {
            let mut first = state.tr();
            first.insert_text("a")?;
            // built against the same base, so stale once `first` lands
            let mut second = state.tr();
            second.insert_text("b")?;
            if let Some(dispatch) = dispatch {
                dispatch(first);
                dispatch(second);
            }
            Ok(true)
        });
        editor.register_command("twice", twice).unwrap();
        let before = editor.doc().clone();

        assert_eq!(editor.try_execute("twice", &[]), Err(EditorError::StaleTransaction));
        assert!(editor.doc().ptr_eq(&before));
        assert_eq!(editor.undo_depth(), 0);
        assert!(!editor.execute("twice", &[]));
        assert_eq!(editor.doc().text_content(), "");
    }

    #[test]
    fn test_command_dispatching_in_sequence_commits_once() {
        let mut editor = editor();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        editor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let chained = crate::command::from_fn(|state, dispatch, _view, _args| {
            let mut first = state.tr();
            first.insert_text("a")?;
            let Some(dispatch) = dispatch else {
                return Ok(true);
            };
            let next = state.apply(first.clone())?;
            let mut second = next.tr();
            second.insert_text("b")?;
            dispatch(first);
            dispatch(second);
            Ok(true)
        });
        editor.register_command("chained", chained).unwrap();

        assert!(editor.execute("chained", &[]));
        assert_eq!(editor.doc().text_content(), "ab");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listeners_and_view_see_new_state() {
        let mut editor = editor();
        editor.set_view(HeadlessView::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let id = editor.subscribe(move |state| {
            counter.store(state.doc().content_size(), Ordering::SeqCst);
        });

        editor.execute("insertText", &[json!("abc")]);
        assert_eq!(seen.load(Ordering::SeqCst), 5);

        assert!(editor.unsubscribe(id));
        editor.execute("insertText", &[json!("d")]);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_focus_through_view() {
        let mut editor = editor();
        assert!(!editor.can("focus", &[]));
        editor.set_view(HeadlessView::new());
        assert!(editor.can("focus", &[]));
        assert!(editor.execute("focus", &[]));
        assert!(editor.view().map_or(false, |v| v.has_focus()));
    }

    #[test]
    fn test_handle_key() {
        let mut editor = editor();
        editor.execute("insertText", &[json!("hi")]);
        assert_eq!(editor.command_for_key("Mod-Shift-z"), Some("redo"));
        assert!(editor.handle_key("Mod-a"));
        assert!(editor.handle_key("Mod-b"));
        assert!(editor.toolbar_states().iter().any(|s| s.id == "strong" && s.active));
        assert!(!editor.handle_key("Mod-q"));
    }

    #[test]
    fn test_set_content_and_clear_history() {
        let mut editor = editor();
        editor
            .set_content(&json!({
                "type": "doc",
                "content": [{"type": "paragraph", "content": [{"type": "text", "text": "x"}]}]
            }))
            .unwrap();
        assert_eq!(editor.doc().text_content(), "x");
        assert_eq!(editor.undo_depth(), 1);
        editor.clear_history();
        assert_eq!(editor.undo_depth(), 0);
    }
}
