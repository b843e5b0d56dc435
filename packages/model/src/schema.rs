//! # Schema
//!
//! Registry of node and mark types. A [`SchemaSpec`] is the declarative
//! form (what plugins contribute); [`Schema::new`] compiles it, resolving
//! content expressions, mark groups and exclusion sets.
//!
//! Node and mark types are addressed through cheap handles
//! ([`NodeType`], [`MarkType`]) holding the schema and an index, so nodes
//! never point back at their parents or at each other.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::content::ContentExpr;
use crate::error::{ModelError, ModelResult};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;

/// Attribute values keyed by name
pub type Attrs = BTreeMap<String, Value>;

/// Declared attribute: either required or with a default value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttrSpec {
    default: Option<Value>,
}

impl AttrSpec {
    pub fn required() -> Self {
        Self { default: None }
    }

    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Declarative description of a node type
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Content expression; empty for leaf nodes
    pub content: String,
    /// Allowed marks: `None` = all, `""` = none, otherwise names/groups
    pub marks: Option<String>,
    /// Space separated group names
    pub group: Option<String>,
    pub inline: bool,
    pub atom: bool,
    pub code: bool,
    pub attrs: Vec<(String, AttrSpec)>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, expr: &str) -> Self {
        self.content = expr.to_string();
        self
    }

    pub fn marks(mut self, marks: &str) -> Self {
        self.marks = Some(marks.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.push((name.to_string(), spec));
        self
    }
}

/// Declarative description of a mark type
#[derive(Debug, Clone)]
pub struct MarkSpec {
    pub attrs: Vec<(String, AttrSpec)>,
    /// Whether text typed at the end of the mark inherits it
    pub inclusive: bool,
    /// Excluded marks: `None` = only itself, `""` = none, `"_"` = all
    pub excludes: Option<String>,
    pub group: Option<String>,
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self {
            attrs: Vec::new(),
            inclusive: true,
            excludes: None,
            group: None,
        }
    }
}

impl MarkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, spec: AttrSpec) -> Self {
        self.attrs.push((name.to_string(), spec));
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    pub fn excludes(mut self, excludes: &str) -> Self {
        self.excludes = Some(excludes.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }
}

/// Uncompiled schema: ordered node and mark specs
#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    nodes: Vec<(String, NodeSpec)>,
    marks: Vec<(String, MarkSpec)>,
    top_node: Option<String>,
}

impl SchemaSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`SchemaSpec::add_node`]; duplicates surface when
    /// the schema is compiled.
    pub fn node(mut self, name: &str, spec: NodeSpec) -> Self {
        self.nodes.push((name.to_string(), spec));
        self
    }

    pub fn mark(mut self, name: &str, spec: MarkSpec) -> Self {
        self.marks.push((name.to_string(), spec));
        self
    }

    pub fn top_node(mut self, name: &str) -> Self {
        self.top_node = Some(name.to_string());
        self
    }

    pub fn add_node(&mut self, name: &str, spec: NodeSpec) -> ModelResult<()> {
        if self.has_node(name) {
            return Err(ModelError::DuplicateType(name.to_string()));
        }
        self.nodes.push((name.to_string(), spec));
        Ok(())
    }

    pub fn add_mark(&mut self, name: &str, spec: MarkSpec) -> ModelResult<()> {
        if self.has_mark(name) {
            return Err(ModelError::DuplicateType(name.to_string()));
        }
        self.marks.push((name.to_string(), spec));
        Ok(())
    }

    /// Append every type of `other`, failing on the first name both declare
    pub fn merge(&mut self, other: SchemaSpec) -> ModelResult<()> {
        for (name, spec) in other.nodes {
            self.add_node(&name, spec)?;
        }
        for (name, spec) in other.marks {
            self.add_mark(&name, spec)?;
        }
        if other.top_node.is_some() {
            self.top_node = other.top_node;
        }
        Ok(())
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.iter().any(|(n, _)| n == name)
    }

    pub fn has_mark(&self, name: &str) -> bool {
        self.marks.iter().any(|(n, _)| n == name)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(n, _)| n.as_str())
    }

    pub fn mark_names(&self) -> impl Iterator<Item = &str> {
        self.marks.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.marks.is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct NodeTypeData {
    pub(crate) name: String,
    pub(crate) groups: Vec<String>,
    pub(crate) inline: bool,
    pub(crate) atom: bool,
    pub(crate) code: bool,
    pub(crate) is_text: bool,
    pub(crate) attrs: Vec<(String, AttrSpec)>,
    pub(crate) content: ContentExpr,
    pub(crate) inline_content: bool,
    /// `None` means every mark is allowed
    pub(crate) marks: Option<Vec<usize>>,
}

#[derive(Debug)]
pub(crate) struct MarkTypeData {
    pub(crate) name: String,
    pub(crate) attrs: Vec<(String, AttrSpec)>,
    pub(crate) inclusive: bool,
    pub(crate) excludes: Vec<usize>,
}

#[derive(Debug)]
struct SchemaInner {
    nodes: Vec<NodeTypeData>,
    node_index: HashMap<String, usize>,
    marks: Vec<MarkTypeData>,
    mark_index: HashMap<String, usize>,
    top: usize,
}

/// Compiled schema. Cloning is cheap.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.inner.nodes.iter().map(|n| &n.name).collect::<Vec<_>>())
            .field("marks", &self.inner.marks.iter().map(|m| &m.name).collect::<Vec<_>>())
            .finish()
    }
}

impl Schema {
    /// Compile a spec. Fails on duplicate names, unknown references in
    /// content expressions or mark lists, and content mixing inline and
    /// block children.
    pub fn new(spec: SchemaSpec) -> ModelResult<Self> {
        let mut node_index = HashMap::new();
        for (i, (name, _)) in spec.nodes.iter().enumerate() {
            if node_index.insert(name.clone(), i).is_some() {
                return Err(ModelError::DuplicateType(name.clone()));
            }
        }
        let mut mark_index = HashMap::new();
        for (i, (name, _)) in spec.marks.iter().enumerate() {
            if mark_index.insert(name.clone(), i).is_some() || node_index.contains_key(name) {
                return Err(ModelError::DuplicateType(name.clone()));
            }
        }

        if !node_index.contains_key("text") {
            return Err(ModelError::schema_violation("Every schema needs a 'text' type"));
        }
        let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_string());
        let top = *node_index
            .get(&top_name)
            .ok_or_else(|| ModelError::UnknownNodeType(top_name.clone()))?;

        let node_groups: Vec<Vec<String>> = spec
            .nodes
            .iter()
            .map(|(_, s)| split_list(s.group.as_deref()))
            .collect();
        let node_inline: Vec<bool> = spec
            .nodes
            .iter()
            .map(|(name, s)| s.inline || name == "text")
            .collect();

        let resolve_nodes = |name: &str| -> Option<Vec<usize>> {
            if let Some(&id) = node_index.get(name) {
                return Some(vec![id]);
            }
            let ids: Vec<usize> = node_groups
                .iter()
                .enumerate()
                .filter(|(_, groups)| groups.iter().any(|g| g == name))
                .map(|(i, _)| i)
                .collect();
            if ids.is_empty() {
                None
            } else {
                Some(ids)
            }
        };

        let mark_groups: Vec<Vec<String>> = spec
            .marks
            .iter()
            .map(|(_, s)| split_list(s.group.as_deref()))
            .collect();
        let resolve_marks = |list: &str, owner: &str| -> ModelResult<Vec<usize>> {
            let mut out = Vec::new();
            for name in list.split_whitespace() {
                if let Some(&id) = mark_index.get(name) {
                    out.push(id);
                    continue;
                }
                let group: Vec<usize> = mark_groups
                    .iter()
                    .enumerate()
                    .filter(|(_, groups)| groups.iter().any(|g| g == name))
                    .map(|(i, _)| i)
                    .collect();
                if group.is_empty() {
                    return Err(ModelError::UnknownMarkType(format!("{} (referenced by {})", name, owner)));
                }
                out.extend(group);
            }
            Ok(out)
        };

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (i, (name, node_spec)) in spec.nodes.iter().enumerate() {
            let content = if name == "text" {
                ContentExpr::empty()
            } else {
                ContentExpr::parse(&node_spec.content, &resolve_nodes).map_err(|message| {
                    ModelError::InvalidContentExpr {
                        ty: name.clone(),
                        message,
                    }
                })?
            };

            let referenced = content.all_types();
            let inline_content = referenced.first().map(|&t| node_inline[t]).unwrap_or(false);
            if referenced.iter().any(|&t| node_inline[t] != inline_content) {
                return Err(ModelError::InvalidContentExpr {
                    ty: name.clone(),
                    message: "Mixing inline and block content".to_string(),
                });
            }

            let marks = match node_spec.marks.as_deref() {
                None | Some("_") => None,
                Some(list) => Some(resolve_marks(list, name)?),
            };

            nodes.push(NodeTypeData {
                name: name.clone(),
                groups: node_groups[i].clone(),
                inline: node_inline[i],
                atom: node_spec.atom,
                code: node_spec.code,
                is_text: name == "text",
                attrs: node_spec.attrs.clone(),
                content,
                inline_content,
                marks,
            });
        }

        let mut marks = Vec::with_capacity(spec.marks.len());
        for (i, (name, mark_spec)) in spec.marks.iter().enumerate() {
            let excludes = match mark_spec.excludes.as_deref() {
                None => vec![i],
                Some("_") => (0..spec.marks.len()).collect(),
                Some(list) => resolve_marks(list, name)?,
            };
            marks.push(MarkTypeData {
                name: name.clone(),
                attrs: mark_spec.attrs.clone(),
                inclusive: mark_spec.inclusive,
                excludes,
            });
        }

        Ok(Self {
            inner: Arc::new(SchemaInner {
                nodes,
                node_index,
                marks,
                mark_index,
                top,
            }),
        })
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn node_type(&self, name: &str) -> ModelResult<NodeType> {
        self.inner
            .node_index
            .get(name)
            .map(|&id| NodeType {
                schema: self.clone(),
                id,
            })
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))
    }

    pub fn mark_type(&self, name: &str) -> ModelResult<MarkType> {
        self.inner
            .mark_index
            .get(name)
            .map(|&id| MarkType {
                schema: self.clone(),
                id,
            })
            .ok_or_else(|| ModelError::UnknownMarkType(name.to_string()))
    }

    pub fn has_node_type(&self, name: &str) -> bool {
        self.inner.node_index.contains_key(name)
    }

    pub fn has_mark_type(&self, name: &str) -> bool {
        self.inner.mark_index.contains_key(name)
    }

    pub fn top_node_type(&self) -> NodeType {
        NodeType {
            schema: self.clone(),
            id: self.inner.top,
        }
    }

    pub fn node_types(&self) -> Vec<NodeType> {
        (0..self.inner.nodes.len())
            .map(|id| NodeType {
                schema: self.clone(),
                id,
            })
            .collect()
    }

    pub fn mark_types(&self) -> Vec<MarkType> {
        (0..self.inner.marks.len())
            .map(|id| MarkType {
                schema: self.clone(),
                id,
            })
            .collect()
    }

    /// Create a node by type name, validating attrs and content
    pub fn node(
        &self,
        name: &str,
        attrs: Option<Attrs>,
        content: impl Into<Fragment>,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        self.node_type(name)?.create(attrs, content, marks)
    }

    /// Create a text node. Empty text is not a valid node.
    pub fn text(&self, text: &str, marks: Vec<Mark>) -> ModelResult<Node> {
        if text.is_empty() {
            return Err(ModelError::schema_violation("Empty text nodes are not allowed"));
        }
        let ty = self.node_type("text")?;
        Ok(Node::new_text(ty, text.to_string(), Mark::normalize_set(marks)))
    }

    pub fn mark(&self, name: &str, attrs: Option<Attrs>) -> ModelResult<Mark> {
        self.mark_type(name)?.create(attrs)
    }

    /// Check a child type sequence against a node type's content grammar
    pub fn validate_content(&self, node_type: &str, child_types: &[&str]) -> bool {
        let Some(&id) = self.inner.node_index.get(node_type) else {
            return false;
        };
        let mut ids = Vec::with_capacity(child_types.len());
        for name in child_types {
            match self.inner.node_index.get(*name) {
                Some(&child) => ids.push(child),
                None => return false,
            }
        }
        self.inner.nodes[id].content.matches(ids)
    }
}

fn split_list(list: Option<&str>) -> Vec<String> {
    list.map(|l| l.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn compute_attrs(ty: &str, specs: &[(String, AttrSpec)], given: Option<&Attrs>) -> ModelResult<Attrs> {
    if let Some(given) = given {
        for key in given.keys() {
            if !specs.iter().any(|(name, _)| name == key) {
                return Err(ModelError::UnknownAttr {
                    ty: ty.to_string(),
                    attr: key.clone(),
                });
            }
        }
    }

    let mut attrs = Attrs::new();
    for (name, spec) in specs {
        let value = match given.and_then(|g| g.get(name)) {
            Some(value) => value.clone(),
            None => spec.default.clone().ok_or_else(|| ModelError::MissingAttr {
                ty: ty.to_string(),
                attr: name.clone(),
            })?,
        };
        attrs.insert(name.clone(), value);
    }
    Ok(attrs)
}

/// Handle to a node type inside a schema
#[derive(Clone)]
pub struct NodeType {
    schema: Schema,
    id: usize,
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.schema.ptr_eq(&other.schema)
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

impl NodeType {
    fn data(&self) -> &NodeTypeData {
        &self.schema.inner.nodes[self.id]
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn groups(&self) -> &[String] {
        &self.data().groups
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.data().groups.iter().any(|g| g == group)
    }

    pub fn is_text(&self) -> bool {
        self.data().is_text
    }

    pub fn is_inline(&self) -> bool {
        self.data().inline
    }

    pub fn is_block(&self) -> bool {
        !self.data().inline
    }

    pub fn is_leaf(&self) -> bool {
        self.data().content.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.data().atom
    }

    pub fn is_code(&self) -> bool {
        self.data().code
    }

    pub fn inline_content(&self) -> bool {
        self.data().inline_content
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content()
    }

    pub fn content_expr(&self) -> &str {
        self.data().content.source()
    }

    pub fn has_required_attrs(&self) -> bool {
        self.data().attrs.iter().any(|(_, spec)| spec.is_required())
    }

    /// Fill defaults and reject unknown or missing attributes
    pub fn compute_attrs(&self, given: Option<&Attrs>) -> ModelResult<Attrs> {
        compute_attrs(self.name(), &self.data().attrs, given)
    }

    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match &self.data().marks {
            None => true,
            Some(allowed) => allowed.contains(&mark_type.id),
        }
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.mark_type()))
    }

    /// Drop the marks this type does not allow on its children
    pub fn allowed_marks(&self, marks: &[Mark]) -> Vec<Mark> {
        marks
            .iter()
            .filter(|m| self.allows_mark_type(m.mark_type()))
            .cloned()
            .collect()
    }

    /// Whether `content` satisfies the content grammar and mark rules
    pub fn valid_content(&self, content: &Fragment) -> bool {
        self.check_content(content).is_ok()
    }

    pub fn check_content(&self, content: &Fragment) -> ModelResult<()> {
        let data = self.data();
        let mut ids = Vec::with_capacity(content.child_count());
        for child in content.iter() {
            if !child.node_type().schema.ptr_eq(&self.schema) {
                return Err(ModelError::schema_violation(format!(
                    "Node {} belongs to a different schema",
                    child.node_type().name()
                )));
            }
            if !self.allows_marks(child.marks()) {
                return Err(ModelError::schema_violation(format!(
                    "Marks not allowed in {}: {}",
                    data.name,
                    child
                        .marks()
                        .iter()
                        .map(|m| m.mark_type().name().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )));
            }
            ids.push(child.node_type().id);
        }
        if data.content.matches(ids) {
            Ok(())
        } else {
            let names: Vec<&str> = content.iter().map(|c| c.node_type().name()).collect();
            Err(ModelError::schema_violation(format!(
                "Invalid content for node {} (expected \"{}\"): [{}]",
                data.name,
                data.content.source(),
                names.join(", ")
            )))
        }
    }

    /// Whether a node of this type can be joined onto a node of `other`
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        if self == other {
            return true;
        }
        let ours = self.data().content.first_types();
        other
            .data()
            .content
            .first_types()
            .iter()
            .any(|t| ours.contains(t))
    }

    /// Create a node of this type, validating attrs and content
    pub fn create(
        &self,
        attrs: Option<Attrs>,
        content: impl Into<Fragment>,
        marks: Vec<Mark>,
    ) -> ModelResult<Node> {
        if self.is_text() {
            return Err(ModelError::schema_violation("Text nodes are created with Schema::text"));
        }
        let attrs = self.compute_attrs(attrs.as_ref())?;
        let content = content.into();
        self.check_content(&content)?;
        Ok(Node::new_branch(self.clone(), attrs, content, Mark::normalize_set(marks)))
    }

    /// Create a node with the minimal valid content, recursively filling
    /// required children (a table cell gets one empty paragraph).
    pub fn create_and_fill(&self, attrs: Option<Attrs>) -> ModelResult<Node> {
        let fill = self.fill_content()?;
        self.create(attrs, fill, Vec::new())
    }

    fn fill_content(&self) -> ModelResult<Fragment> {
        self.fill_content_guarded(&mut Vec::new())
    }

    fn fill_content_guarded(&self, visiting: &mut Vec<usize>) -> ModelResult<Fragment> {
        if visiting.contains(&self.id) {
            return Err(ModelError::schema_violation(format!(
                "Cannot fill {}: content is recursive",
                self.name()
            )));
        }
        visiting.push(self.id);

        let nodes = &self.schema.inner.nodes;
        let path = self
            .data()
            .content
            .shortest_fill(&|ty| {
                let data = &nodes[ty];
                !data.is_text && !data.attrs.iter().any(|(_, s)| s.is_required())
            })
            .ok_or_else(|| {
                ModelError::schema_violation(format!("No valid default content for {}", self.name()))
            })?;

        let mut children = Vec::with_capacity(path.len());
        for ty in path {
            let child_type = NodeType {
                schema: self.schema.clone(),
                id: ty,
            };
            let content = child_type.fill_content_guarded(visiting)?;
            children.push(child_type.create(None, content, Vec::new())?);
        }

        visiting.pop();
        Ok(Fragment::from_nodes(children))
    }
}

/// Handle to a mark type inside a schema
#[derive(Clone)]
pub struct MarkType {
    schema: Schema,
    id: usize,
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.schema.ptr_eq(&other.schema)
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}

impl MarkType {
    fn data(&self) -> &MarkTypeData {
        &self.schema.inner.marks[self.id]
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// Ordering of marks inside a mark set
    pub fn rank(&self) -> usize {
        self.id
    }

    pub fn is_inclusive(&self) -> bool {
        self.data().inclusive
    }

    pub fn excludes(&self, other: &MarkType) -> bool {
        self.schema.ptr_eq(&other.schema) && self.data().excludes.contains(&other.id)
    }

    pub fn create(&self, attrs: Option<Attrs>) -> ModelResult<Mark> {
        let attrs = compute_attrs(self.name(), &self.data().attrs, attrs.as_ref())?;
        Ok(Mark::new(self.clone(), attrs))
    }

    /// First mark of this type in `set`
    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|m| m.mark_type() == self)
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| m.mark_type() != self).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> SchemaSpec {
        SchemaSpec::new()
            .node("doc", NodeSpec::new().content("block+"))
            .node("paragraph", NodeSpec::new().content("inline*").group("block"))
            .node(
                "heading",
                NodeSpec::new()
                    .content("inline*")
                    .group("block")
                    .attr("level", AttrSpec::with_default(1)),
            )
            .node("code_block", NodeSpec::new().content("text*").marks("").group("block").code())
            .node("text", NodeSpec::new().group("inline"))
            .mark("strong", MarkSpec::new())
            .mark("code", MarkSpec::new().excludes("_"))
    }

    #[test]
    fn test_compile_schema() {
        let schema = Schema::new(spec()).unwrap();
        let paragraph = schema.node_type("paragraph").unwrap();
        assert!(paragraph.is_textblock());
        assert!(!paragraph.is_leaf());
        assert!(schema.node_type("text").unwrap().is_inline());
        assert_eq!(schema.top_node_type().name(), "doc");
    }

    #[test]
    fn test_validate_content() {
        let schema = Schema::new(spec()).unwrap();
        assert!(schema.validate_content("doc", &["paragraph", "heading"]));
        assert!(!schema.validate_content("doc", &[]));
        assert!(!schema.validate_content("doc", &["text"]));
        assert!(!schema.validate_content("paragraph", &["paragraph"]));
        assert!(!schema.validate_content("doc", &["widget"]));
        assert!(!schema.validate_content("widget", &[]));
    }

    #[test]
    fn test_duplicate_type_fails() {
        let spec = spec().node("paragraph", NodeSpec::new().content("inline*"));
        assert_eq!(
            Schema::new(spec).unwrap_err(),
            ModelError::DuplicateType("paragraph".to_string())
        );
    }

    #[test]
    fn test_mixed_content_fails() {
        let spec = spec().node("mixed", NodeSpec::new().content("paragraph text"));
        assert!(matches!(
            Schema::new(spec),
            Err(ModelError::InvalidContentExpr { .. })
        ));
    }

    #[test]
    fn test_unknown_reference_fails() {
        let spec = spec().node("list", NodeSpec::new().content("list_item+"));
        assert!(matches!(
            Schema::new(spec),
            Err(ModelError::InvalidContentExpr { .. })
        ));
    }

    #[test]
    fn test_attrs_defaults_and_errors() {
        let schema = Schema::new(spec()).unwrap();
        let heading = schema.node_type("heading").unwrap();
        assert_eq!(heading.compute_attrs(None).unwrap()["level"], json!(1));

        let mut unknown = Attrs::new();
        unknown.insert("color".to_string(), json!("red"));
        assert!(matches!(
            heading.compute_attrs(Some(&unknown)),
            Err(ModelError::UnknownAttr { .. })
        ));
    }

    #[test]
    fn test_mark_exclusion_and_allowed_marks() {
        let schema = Schema::new(spec()).unwrap();
        let strong = schema.mark_type("strong").unwrap();
        let code = schema.mark_type("code").unwrap();
        assert!(code.excludes(&strong));
        assert!(strong.excludes(&strong));
        assert!(!strong.excludes(&code));

        let code_block = schema.node_type("code_block").unwrap();
        assert!(!code_block.allows_mark_type(&strong));
        assert!(schema.node_type("paragraph").unwrap().allows_mark_type(&strong));
    }
}
