//! # Editor state
//!
//! An [`EditorState`] is an immutable snapshot: schema, document,
//! selection, stored marks and (optionally) undo history. Applying a
//! transaction produces a new state; the old one is never touched.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use scribe_model::{Mark, Node, Schema};

use crate::config::HistoryConfig;
use crate::errors::{EditorError, EditorResult};
use crate::history::History;
use crate::selection::Selection;
use crate::transaction::Transaction;

#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Schema,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    history: Option<Arc<History>>,
}

impl EditorState {
    /// New state. The document defaults to the top node's minimal
    /// content and the selection to the start of the document.
    pub fn create(schema: Schema, doc: Option<Node>, selection: Option<Selection>) -> EditorResult<Self> {
        let doc = match doc {
            Some(doc) => doc,
            None => schema.top_node_type().create_and_fill(None)?,
        };
        if doc.node_type() != &schema.top_node_type() {
            return Err(EditorError::SchemaViolation(scribe_model::ModelError::schema_violation(
                format!("Document root must be {}", schema.top_node_type().name()),
            )));
        }
        doc.check()?;
        let selection = selection.unwrap_or_else(|| Selection::at_start(&doc));
        selection.validate(&doc)?;
        Ok(Self {
            schema,
            doc,
            selection,
            stored_marks: None,
            history: None,
        })
    }

    /// Same state with an empty undo history
    pub fn with_history(mut self, config: HistoryConfig) -> Self {
        self.history = Some(Arc::new(History::new(config)));
        self
    }

    /// Same state with `history` in place of the current one
    pub(crate) fn replace_history(&self, history: History) -> Self {
        let mut next = self.clone();
        next.history = Some(Arc::new(history));
        next
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_deref()
    }

    /// Start a transaction against this state
    pub fn tr(&self) -> Transaction {
        Transaction::new(self)
    }

    /// Apply a transaction, producing the next state. The transaction is
    /// consumed. Fails without side effects when the transaction recorded
    /// a failed step, was built against another state, or would leave an
    /// invalid document or selection.
    pub fn apply(&self, tr: Transaction) -> EditorResult<EditorState> {
        if let Some(failure) = tr.failure() {
            return Err(EditorError::transaction_failed(failure));
        }
        if !tr.before().ptr_eq(&self.doc) || tr.base_selection() != &self.selection || !tr.schema().ptr_eq(&self.schema)
        {
            return Err(EditorError::StaleTransaction);
        }
        if tr.doc_changed() {
            tr.doc().check()?;
        }
        let selection = tr.selection();
        selection.validate(tr.doc())?;

        let stored_marks = if selection.is_empty() {
            tr.stored_marks().map(<[Mark]>::to_vec)
        } else {
            None
        };

        let history = match &self.history {
            Some(history) => Some(Arc::new(history.apply(&tr, &self.selection, &selection)?)),
            None => None,
        };

        debug!(
            steps = tr.steps().len(),
            doc_changed = tr.doc_changed(),
            "Applied transaction"
        );
        Ok(EditorState {
            schema: self.schema.clone(),
            doc: tr.doc().clone(),
            selection,
            stored_marks,
            history,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "doc": self.doc.to_json(),
            "selection": serde_json::to_value(self.selection).unwrap_or(Value::Null),
        })
    }

    pub fn from_json(schema: Schema, value: &Value) -> EditorResult<Self> {
        let doc_json = value
            .get("doc")
            .ok_or_else(|| EditorError::SchemaViolation(scribe_model::ModelError::json("Missing \"doc\"")))?;
        let doc = Node::from_json(&schema, doc_json)?;
        let selection = match value.get("selection") {
            Some(selection) => Some(
                serde_json::from_value::<Selection>(selection.clone())
                    .map_err(|e| EditorError::SchemaViolation(e.into()))?,
            ),
            None => None,
        };
        Self::create(schema, Some(doc), selection)
    }
}
