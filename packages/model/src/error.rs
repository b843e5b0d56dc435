use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Unsupported attribute {attr} for {ty}")]
    UnknownAttr { ty: String, attr: String },

    #[error("No value supplied for required attribute {attr} of {ty}")]
    MissingAttr { ty: String, attr: String },

    #[error("Invalid content expression for {ty}: {message}")]
    InvalidContentExpr { ty: String, message: String },

    #[error("Position {pos} out of range (document size {size})")]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("Invalid replace: {0}")]
    InvalidReplace(String),

    #[error("Type {0} is declared more than once")]
    DuplicateType(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl ModelError {
    pub fn schema_violation(message: impl Into<String>) -> Self {
        Self::SchemaViolation(message.into())
    }

    pub fn invalid_replace(message: impl Into<String>) -> Self {
        Self::InvalidReplace(message.into())
    }

    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::Json(e.to_string())
    }
}
