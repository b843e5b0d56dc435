//! Error types for the editor

use scribe_model::ModelError;
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("Schema violation: {0}")]
    SchemaViolation(#[from] ModelError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Command {name} failed: {message}")]
    CommandFailure { name: String, message: String },

    #[error("Position {pos} is not valid in the current document (size {size})")]
    StalePosition { pos: usize, size: usize },

    #[error("Text selection endpoint {pos} is not inside inline content")]
    InvalidSelection { pos: usize },

    #[error("Transaction was built against a state that is no longer current")]
    StaleTransaction,

    #[error("Plugin {plugin} redeclares {kind} '{name}'")]
    PluginConflict {
        kind: String,
        name: String,
        plugin: String,
    },

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl EditorError {
    pub fn conflict(kind: &str, name: &str, plugin: &str) -> Self {
        Self::PluginConflict {
            kind: kind.to_string(),
            name: name.to_string(),
            plugin: plugin.to_string(),
        }
    }

    pub fn transaction_failed(message: impl Into<String>) -> Self {
        Self::TransactionFailed(message.into())
    }
}

/// Error returned by a command body
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("Invalid argument {index}: {message}")]
    InvalidArgument { index: usize, message: String },

    #[error("{0}")]
    Message(String),
}

impl CommandError {
    pub fn invalid_argument(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            index,
            message: message.into(),
        }
    }
}

impl From<ModelError> for CommandError {
    fn from(e: ModelError) -> Self {
        CommandError::Editor(EditorError::SchemaViolation(e))
    }
}
