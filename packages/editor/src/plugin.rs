//! # Plugins
//!
//! A plugin is a bundle of:
//!
//! - schema contributions (node and mark types), merged before the
//!   schema is built
//! - commands, registered under globally unique names
//! - toolbar descriptors, read only by a view layer
//! - keybindings mapping key combinations to command names
//!
//! Plugins are registered once, when an editor is built. Any name clash
//! (plugin, node type, mark type, command, keybinding or toolbar id)
//! aborts construction with [`EditorError::PluginConflict`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use scribe_model::{Schema, SchemaSpec};

use crate::command::{Command, CommandManager};
use crate::errors::{EditorError, EditorResult};
use crate::state::EditorState;

/// Predicate over the current state, used for toolbar `active`/`enabled`
pub type StatePredicate = Arc<dyn Fn(&EditorState) -> bool + Send + Sync>;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new()
    }

    /// Commands, given the merged schema of all plugins
    fn commands(&self, _schema: &Schema) -> EditorResult<Vec<(String, Arc<dyn Command>)>> {
        Ok(Vec::new())
    }

    fn toolbar(&self, _schema: &Schema) -> EditorResult<Vec<ToolbarItem>> {
        Ok(Vec::new())
    }

    /// Key combination → command name
    fn keymap(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// A toolbar control. `enabled` defaults to whether the command can run.
#[derive(Clone)]
pub struct ToolbarItem {
    pub id: String,
    pub icon: String,
    pub label: String,
    pub command: String,
    pub args: Vec<Value>,
    active: Option<StatePredicate>,
    enabled: Option<StatePredicate>,
}

impl fmt::Debug for ToolbarItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolbarItem")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("args", &self.args)
            .finish()
    }
}

impl ToolbarItem {
    pub fn new(id: &str, command: &str) -> Self {
        Self {
            id: id.to_string(),
            icon: id.to_string(),
            label: id.to_string(),
            command: command.to_string(),
            args: Vec::new(),
            active: None,
            enabled: None,
        }
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn active(mut self, f: impl Fn(&EditorState) -> bool + Send + Sync + 'static) -> Self {
        self.active = Some(Arc::new(f));
        self
    }

    pub fn enabled(mut self, f: impl Fn(&EditorState) -> bool + Send + Sync + 'static) -> Self {
        self.enabled = Some(Arc::new(f));
        self
    }

    /// Evaluate the item against a state
    pub fn state(&self, state: &EditorState, commands: &CommandManager) -> ToolbarState {
        let enabled = match &self.enabled {
            Some(f) => f(state),
            None => commands.can(&self.command, state, &self.args),
        };
        ToolbarState {
            id: self.id.clone(),
            icon: self.icon.clone(),
            label: self.label.clone(),
            command: self.command.clone(),
            active: self.active.as_ref().map_or(false, |f| f(state)),
            enabled,
        }
    }
}

/// Evaluated toolbar item, ready for a view to render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolbarState {
    pub id: String,
    pub icon: String,
    pub label: String,
    pub command: String,
    pub active: bool,
    pub enabled: bool,
}

/// Normalise a key combination so that modifier order does not matter:
/// `Shift-Mod-z` and `Mod-Shift-z` are the same binding
pub fn normalize_key(key: &str) -> String {
    const ORDER: [&str; 5] = ["Mod", "Ctrl", "Meta", "Alt", "Shift"];
    let mut parts: Vec<&str> = key.split('-').collect();
    // a trailing `-` is the minus key itself
    let base = match parts.pop() {
        Some("") if key.ends_with("--") || key == "-" => "-",
        Some(base) => base,
        None => "",
    };
    let mut modifiers: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    modifiers.sort_by_key(|m| ORDER.iter().position(|o| o == m).unwrap_or(ORDER.len()));
    modifiers.dedup();
    modifiers.push(base);
    modifiers.join("-")
}

struct Binding {
    command: String,
    plugin: String,
}

/// Plugins registered on one editor, with their merged keymap and toolbar
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    keymap: HashMap<String, Binding>,
    toolbar: Vec<ToolbarItem>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugin_names())
            .field("keymap", &self.keymap.len())
            .field("toolbar", &self.toolbar)
            .finish()
    }
}

/// Everything registration produces
pub struct Registration {
    pub schema: Schema,
    pub commands: CommandManager,
    pub registry: PluginRegistry,
}

impl PluginRegistry {
    /// Register `plugins` in order: merge schemas, build the schema, then
    /// register commands, keybindings and toolbar items. `commands` may
    /// already hold built-ins, which plugins cannot override.
    pub fn register(plugins: Vec<Arc<dyn Plugin>>, mut commands: CommandManager) -> EditorResult<Registration> {
        let mut spec = SchemaSpec::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut seen_plugins: Vec<&str> = Vec::new();

        for plugin in &plugins {
            let name = plugin.name();
            if seen_plugins.contains(&name) {
                return Err(EditorError::conflict("plugin", name, name));
            }
            seen_plugins.push(name);

            let contribution = plugin.schema();
            for node in contribution.node_names() {
                if owners.insert(format!("node:{}", node), name.to_string()).is_some() {
                    return Err(EditorError::conflict("node", node, name));
                }
            }
            for mark in contribution.mark_names() {
                if owners.insert(format!("mark:{}", mark), name.to_string()).is_some() {
                    return Err(EditorError::conflict("mark", mark, name));
                }
            }
            spec.merge(contribution)?;
        }

        let schema = Schema::new(spec)?;
        let mut registry = PluginRegistry::default();

        for plugin in &plugins {
            commands.register_all(plugin.commands(&schema)?, plugin.name())?;
        }
        for plugin in &plugins {
            registry.add_keymap(plugin.as_ref(), &commands)?;
            registry.add_toolbar(plugin.as_ref(), &schema, &commands)?;
            debug!(plugin = plugin.name(), "Registered plugin");
        }

        info!(
            plugins = plugins.len(),
            commands = commands.names().len(),
            keybindings = registry.keymap.len(),
            "Plugins registered"
        );
        registry.plugins = plugins;
        Ok(Registration {
            schema,
            commands,
            registry,
        })
    }

    fn add_keymap(&mut self, plugin: &dyn Plugin, commands: &CommandManager) -> EditorResult<()> {
        for (key, command) in plugin.keymap() {
            if !commands.contains(&command) {
                return Err(EditorError::UnknownCommand(command));
            }
            let key = normalize_key(&key);
            if self.keymap.contains_key(&key) {
                return Err(EditorError::conflict("keybinding", &key, plugin.name()));
            }
            self.keymap.insert(
                key,
                Binding {
                    command,
                    plugin: plugin.name().to_string(),
                },
            );
        }
        Ok(())
    }

    fn add_toolbar(&mut self, plugin: &dyn Plugin, schema: &Schema, commands: &CommandManager) -> EditorResult<()> {
        for item in plugin.toolbar(schema)? {
            if !commands.contains(&item.command) {
                return Err(EditorError::UnknownCommand(item.command));
            }
            if self.toolbar.iter().any(|existing| existing.id == item.id) {
                return Err(EditorError::conflict("toolbar", &item.id, plugin.name()));
            }
            self.toolbar.push(item);
        }
        Ok(())
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Command bound to a key combination
    pub fn command_for_key(&self, key: &str) -> Option<&str> {
        self.keymap.get(&normalize_key(key)).map(|b| b.command.as_str())
    }

    /// Plugin that contributed a keybinding
    pub fn key_owner(&self, key: &str) -> Option<&str> {
        self.keymap.get(&normalize_key(key)).map(|b| b.plugin.as_str())
    }

    /// Bindings sorted by key
    pub fn keybindings(&self) -> Vec<(&str, &str)> {
        let mut bindings: Vec<(&str, &str)> = self
            .keymap
            .iter()
            .map(|(key, binding)| (key.as_str(), binding.command.as_str()))
            .collect();
        bindings.sort_unstable();
        bindings
    }

    pub fn toolbar(&self) -> &[ToolbarItem] {
        &self.toolbar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_orders_modifiers() {
        assert_eq!(normalize_key("Shift-Mod-z"), "Mod-Shift-z");
        assert_eq!(normalize_key("Mod-Shift-z"), "Mod-Shift-z");
        assert_eq!(normalize_key("Enter"), "Enter");
        assert_eq!(normalize_key("Mod--"), "Mod--");
    }
}
