//! # Scribe Model
//!
//! Immutable document model for the Scribe editing engine.
//!
//! ## Architecture
//!
//! ```text
//! SchemaSpec ──compile──▶ Schema ──create──▶ Node ──resolve──▶ ResolvedPos
//!                            │                 │
//!                     ContentExpr (NFA)   Fragment / Mark / Slice
//! ```
//!
//! - A [`Schema`] is compiled once from a [`SchemaSpec`] and shared by
//!   every node created from it.
//! - [`Node`]s never change after construction; edits go through
//!   [`Node::replace`] and return a new root that shares every subtree
//!   the edit did not touch.
//! - No operation in this crate can produce a tree that violates the
//!   schema: constructors and `replace` validate what they build.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scribe_model::{NodeSpec, Schema, SchemaSpec, Slice};
//!
//! let schema = Schema::new(
//!     SchemaSpec::new()
//!         .node("doc", NodeSpec::new().content("paragraph+"))
//!         .node("paragraph", NodeSpec::new().content("text*"))
//!         .node("text", NodeSpec::new()),
//! )?;
//! let hello = schema.text("Hello", vec![])?;
//! let doc = schema.node("doc", None, schema.node("paragraph", None, hello, vec![])?, vec![])?;
//! let doc = doc.replace(6, 6, &Slice::closed(schema.text(" world", vec![])?))?;
//! assert_eq!(doc.text_content(), "Hello world");
//! ```

mod content;
mod error;
mod fragment;
mod json;
mod mark;
mod node;
mod replace;
mod resolved;
mod schema;

#[cfg(test)]
mod test_schema;

pub use error::{ModelError, ModelResult};
pub use fragment::Fragment;
pub use json::{DocumentFormat, JsonFormat};
pub use mark::Mark;
pub use node::Node;
pub use replace::{replace, Slice};
pub use resolved::{NodeRange, ResolvedPos};
pub use schema::{AttrSpec, Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaSpec};
