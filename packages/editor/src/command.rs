//! # Commands
//!
//! A command is a named operation over an [`EditorState`]. It is always
//! called with the state and, optionally, a dispatch function and a view:
//!
//! - with `dispatch`, the command builds a transaction and hands it over
//! - without `dispatch`, it only reports whether it *could* run, and must
//!   not have any side effect
//!
//! This duality backs [`CommandManager::can`] versus
//! [`CommandManager::execute`], letting toolbars disable controls without
//! editing anything.
//!
//! The manager isolates failures: an unknown name, an error returned by a
//! command, or a panic inside one all come back as `false` from `execute`
//! (with a log line) and never take the editor down.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::errors::{CommandError, EditorError, EditorResult};
use crate::state::EditorState;
use crate::transaction::Transaction;
use crate::view::EditorView;

pub type CommandResult = Result<bool, CommandError>;

pub trait Command: Send + Sync {
    fn run(
        &self,
        state: &EditorState,
        dispatch: Option<&mut dyn FnMut(Transaction)>,
        view: Option<&mut dyn EditorView>,
        args: &[Value],
    ) -> CommandResult;
}

struct FnCommand<F>(F);

impl<F> Command for FnCommand<F>
where
    F: Fn(&EditorState, Option<&mut dyn FnMut(Transaction)>, Option<&mut dyn EditorView>, &[Value]) -> CommandResult
        + Send
        + Sync,
{
    fn run(
        &self,
        state: &EditorState,
        dispatch: Option<&mut dyn FnMut(Transaction)>,
        view: Option<&mut dyn EditorView>,
        args: &[Value],
    ) -> CommandResult {
        (self.0)(state, dispatch, view, args)
    }
}

/// Wrap a closure as a command
pub fn from_fn<F>(f: F) -> Arc<dyn Command>
where
    F: Fn(&EditorState, Option<&mut dyn FnMut(Transaction)>, Option<&mut dyn EditorView>, &[Value]) -> CommandResult
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnCommand(f))
}

struct Registered {
    command: Arc<dyn Command>,
    plugin: String,
}

/// Name → command table owned by one editor
#[derive(Default)]
pub struct CommandManager {
    commands: HashMap<String, Registered>,
    aliases: HashMap<String, String>,
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("commands", &self.names())
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl CommandManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command on behalf of `plugin`. Names are unique across
    /// all plugins.
    pub fn register(&mut self, name: &str, command: Arc<dyn Command>, plugin: &str) -> EditorResult<()> {
        if self.commands.contains_key(name) || self.aliases.contains_key(name) {
            return Err(EditorError::conflict("command", name, plugin));
        }
        self.commands.insert(
            name.to_string(),
            Registered {
                command,
                plugin: plugin.to_string(),
            },
        );
        debug!(command = name, plugin, "Registered command");
        Ok(())
    }

    /// Register several commands; on a conflict none of them are added
    pub fn register_all(
        &mut self,
        commands: impl IntoIterator<Item = (String, Arc<dyn Command>)>,
        plugin: &str,
    ) -> EditorResult<()> {
        let commands: Vec<_> = commands.into_iter().collect();
        let mut seen = Vec::with_capacity(commands.len());
        for (name, _) in &commands {
            if self.commands.contains_key(name) || self.aliases.contains_key(name) || seen.contains(&name) {
                return Err(EditorError::conflict("command", name, plugin));
            }
            seen.push(name);
        }
        for (name, command) in commands {
            self.register(&name, command, plugin)?;
        }
        Ok(())
    }

    /// Make `alias` resolve to `target`. The alias is owned by whoever
    /// registered the target. An existing command or alias of that name
    /// is a conflict.
    pub fn alias(&mut self, alias: &str, target: &str) -> EditorResult<()> {
        if let Some(owner) = self.owner(alias) {
            return Err(EditorError::conflict("command", alias, owner));
        }
        if !self.commands.contains_key(target) {
            return Err(EditorError::UnknownCommand(target.to_string()));
        }
        self.aliases.insert(alias.to_string(), target.to_string());
        Ok(())
    }

    /// Remove a command and every alias pointing at it. Returns whether
    /// the command existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self.commands.remove(name).is_some();
        if removed {
            self.aliases.retain(|_, target| target != name);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.aliases.clear();
    }

    /// Canonical name for `name`, following an alias
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(self.resolve(name)).map(|r| &r.command)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Plugin that registered `name`
    pub fn owner(&self, name: &str) -> Option<&str> {
        self.commands.get(self.resolve(name)).map(|r| r.plugin.as_str())
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether `name` could run against `state`. Never edits anything;
    /// unknown names and failing commands are reported as `false`.
    pub fn can(&self, name: &str, state: &EditorState, args: &[Value]) -> bool {
        self.try_execute(name, state, None, None, args).unwrap_or(false)
    }

    /// Run a command, turning every failure into an error value
    pub fn try_execute(
        &self,
        name: &str,
        state: &EditorState,
        dispatch: Option<&mut dyn FnMut(Transaction)>,
        view: Option<&mut dyn EditorView>,
        args: &[Value],
    ) -> EditorResult<bool> {
        let command = self
            .get(name)
            .ok_or_else(|| EditorError::UnknownCommand(name.to_string()))?;

        match catch_unwind(AssertUnwindSafe(|| command.run(state, dispatch, view, args))) {
            Ok(Ok(ran)) => Ok(ran),
            Ok(Err(e)) => Err(EditorError::CommandFailure {
                name: name.to_string(),
                message: e.to_string(),
            }),
            Err(payload) => Err(EditorError::CommandFailure {
                name: name.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Run a command. Failures are logged and reported as `false`.
    #[instrument(skip(self, state, dispatch, view, args), fields(command = name))]
    pub fn execute(
        &self,
        name: &str,
        state: &EditorState,
        dispatch: Option<&mut dyn FnMut(Transaction)>,
        view: Option<&mut dyn EditorView>,
        args: &[Value],
    ) -> bool {
        match self.try_execute(name, state, dispatch, view, args) {
            Ok(ran) => ran,
            Err(e @ EditorError::UnknownCommand(_)) => {
                warn!(error = %e, "Command lookup failed");
                false
            }
            Err(e) => {
                error!(error = %e, "Command failed");
                false
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "command panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use crate::test_support::{doc, p, state_with, text};

    fn manager() -> CommandManager {
        let mut manager = CommandManager::new();
        manager
            .register(
                "append",
                from_fn(|state, dispatch, _view, args| {
                    let value = args.first().and_then(Value::as_str).unwrap_or("!");
                    let mut tr = state.tr();
                    if tr.insert_text(value).is_err() {
                        return Ok(false);
                    }
                    if let Some(dispatch) = dispatch {
                        dispatch(tr);
                    }
                    Ok(true)
                }),
                "test",
            )
            .unwrap();
        manager
    }

    fn state() -> EditorState {
        state_with(doc(vec![p(vec![text("ab")])]), Selection::cursor(3))
    }

    #[test]
    fn test_execute_dispatches() {
        let manager = manager();
        let state = state();
        let mut sent = Vec::new();
        let mut dispatch = |tr: Transaction| sent.push(tr);
        assert!(manager.execute("append", &state, Some(&mut dispatch), None, &[]));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].doc().text_content(), "ab!");
    }

    #[test]
    fn test_can_has_no_side_effects() {
        let manager = manager();
        let state = state();
        assert!(manager.can("append", &state, &[]));
        assert!(!manager.can("missing", &state, &[]));
        assert_eq!(state.doc().text_content(), "ab");
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let mut manager = manager();
        let err = manager
            .register("append", from_fn(|_, _, _, _| Ok(true)), "other")
            .unwrap_err();
        assert_eq!(err, EditorError::conflict("command", "append", "other"));
    }

    #[test]
    fn test_register_all_is_atomic() {
        let mut manager = manager();
        let batch = vec![
            ("fresh".to_string(), from_fn(|_, _, _, _| Ok(true))),
            ("append".to_string(), from_fn(|_, _, _, _| Ok(true))),
        ];
        assert!(manager.register_all(batch, "other").is_err());
        assert!(!manager.contains("fresh"));
    }

    #[test]
    fn test_alias_and_unregister() {
        let mut manager = manager();
        manager.alias("bang", "append").unwrap();
        assert_eq!(manager.resolve("bang"), "append");
        assert!(manager.can("bang", &state(), &[]));

        assert!(manager.unregister("append"));
        assert!(!manager.contains("bang"));
        assert_eq!(manager.resolve("bang"), "bang");
    }

    #[test]
    fn test_alias_cannot_be_redeclared() {
        let mut manager = manager();
        manager
            .register("other", from_fn(|_, _, _, _| Ok(true)), "second")
            .unwrap();
        manager.alias("bang", "append").unwrap();
        assert_eq!(
            manager.alias("bang", "other"),
            Err(EditorError::conflict("command", "bang", "test"))
        );
        assert_eq!(manager.resolve("bang"), "append");
        assert_eq!(
            manager.alias("other", "append"),
            Err(EditorError::conflict("command", "other", "second"))
        );
    }

    #[test]
    fn test_alias_to_unknown_fails() {
        let mut manager = manager();
        assert_eq!(
            manager.alias("x", "nope"),
            Err(EditorError::UnknownCommand("nope".to_string()))
        );
    }

    #[test]
    fn test_panicking_command_is_isolated() {
        let mut manager = manager();
        manager
            .register("boom", from_fn(|_, _, _, _| panic!("kaboom")), "test")
            .unwrap();
        let state = state();
        assert!(!manager.execute("boom", &state, None, None, &[]));
        match manager.try_execute("boom", &state, None, None, &[]) {
            Err(EditorError::CommandFailure { name, message }) => {
                assert_eq!(name, "boom");
                assert_eq!(message, "kaboom");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_erroring_command_is_failure() {
        let mut manager = manager();
        manager
            .register(
                "bad",
                from_fn(|_, _, _, _| Err(CommandError::Message("nope".to_string()))),
                "test",
            )
            .unwrap();
        assert!(matches!(
            manager.try_execute("bad", &state(), None, None, &[]),
            Err(EditorError::CommandFailure { .. })
        ));
        assert!(!manager.execute("unknown", &state(), None, None, &[]));
    }
}
