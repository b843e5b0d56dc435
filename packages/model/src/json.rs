//! # JSON document form
//!
//! ```json
//! {"type": "doc", "content": [
//!   {"type": "paragraph", "content": [
//!     {"type": "text", "text": "Hi", "marks": [{"type": "strong"}]}
//!   ]}
//! ]}
//! ```
//!
//! Parsing goes through the schema constructors, so a document that
//! parses is valid. Other formats plug in through [`DocumentFormat`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::mark::Mark;
use crate::node::Node;
use crate::schema::{Attrs, Schema};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeJson {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<MarkJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkJson {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
}

impl MarkJson {
    fn from_mark(mark: &Mark) -> Self {
        Self {
            ty: mark.mark_type().name().to_string(),
            attrs: mark.attrs().clone(),
        }
    }

    fn into_mark(self, schema: &Schema) -> ModelResult<Mark> {
        schema.mark(&self.ty, Some(self.attrs))
    }
}

impl NodeJson {
    fn from_node(node: &Node) -> Self {
        Self {
            ty: node.type_name().to_string(),
            attrs: node.attrs().clone(),
            content: node.content().iter().map(NodeJson::from_node).collect(),
            text: node.text().map(str::to_string),
            marks: node.marks().iter().map(MarkJson::from_mark).collect(),
        }
    }

    fn into_node(self, schema: &Schema) -> ModelResult<Node> {
        let marks = self
            .marks
            .into_iter()
            .map(|m| m.into_mark(schema))
            .collect::<ModelResult<Vec<_>>>()?;
        if let Some(text) = self.text {
            if self.ty != "text" {
                return Err(ModelError::json(format!("Node {} cannot carry text", self.ty)));
            }
            return schema.text(&text, marks);
        }
        let content = self
            .content
            .into_iter()
            .map(|c| c.into_node(schema))
            .collect::<ModelResult<Vec<_>>>()?;
        schema.node(&self.ty, Some(self.attrs), content, marks)
    }
}

impl Node {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(NodeJson::from_node(self)).unwrap_or(Value::Null)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> ModelResult<Node> {
        let parsed: NodeJson = serde_json::from_value(value.clone())?;
        parsed.into_node(schema)
    }
}

impl Mark {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(MarkJson::from_mark(self)).unwrap_or(Value::Null)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> ModelResult<Mark> {
        let parsed: MarkJson = serde_json::from_value(value.clone())?;
        parsed.into_mark(schema)
    }
}

/// Serialize/parse adapter for a document format
pub trait DocumentFormat {
    fn name(&self) -> &str;

    fn serialize(&self, doc: &Node) -> ModelResult<String>;

    fn parse(&self, schema: &Schema, input: &str) -> ModelResult<Node>;
}

/// The built-in JSON format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat {
    pub pretty: bool,
}

impl JsonFormat {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl DocumentFormat for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize(&self, doc: &Node) -> ModelResult<String> {
        let json = NodeJson::from_node(doc);
        let text = if self.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        Ok(text)
    }

    fn parse(&self, schema: &Schema, input: &str) -> ModelResult<Node> {
        let parsed: NodeJson = serde_json::from_str(input)?;
        let doc = parsed.into_node(schema)?;
        if doc.node_type() != &schema.top_node_type() {
            return Err(ModelError::schema_violation(format!(
                "Expected a {} at the root, found {}",
                schema.top_node_type().name(),
                doc.type_name()
            )));
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_schema::{doc, p, schema, strong, text};
    use serde_json::json;

    #[test]
    fn test_to_json_shape() {
        let d = doc(vec![p(vec![strong(text("Hi"))])]);
        assert_eq!(
            d.to_json(),
            json!({
                "type": "doc",
                "content": [{
                    "type": "paragraph",
                    "content": [{"type": "text", "text": "Hi", "marks": [{"type": "strong"}]}]
                }]
            })
        );
    }

    #[test]
    fn test_parse_rejects_invalid_document() {
        let schema = schema();
        let invalid = json!({"type": "doc", "content": [{"type": "text", "text": "loose"}]});
        assert!(matches!(
            Node::from_json(&schema, &invalid),
            Err(ModelError::SchemaViolation(_))
        ));

        let unknown = json!({"type": "doc", "content": [{"type": "widget"}]});
        assert!(matches!(
            Node::from_json(&schema, &unknown),
            Err(ModelError::UnknownNodeType(_))
        ));
    }

    #[test]
    fn test_json_format_requires_top_node() {
        let schema = schema();
        let format = JsonFormat::default();
        assert!(format.parse(&schema, r#"{"type": "paragraph"}"#).is_err());
        assert!(format.parse(&schema, "not json").is_err());

        let d = doc(vec![p(vec![text("x")])]);
        let text = format.serialize(&d).unwrap();
        assert_eq!(format.parse(&schema, &text).unwrap(), d);
    }
}
