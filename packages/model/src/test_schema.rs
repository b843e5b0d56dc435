//! Shared fixture schema and node builders for unit tests

use std::sync::OnceLock;

use crate::fragment::Fragment;
use crate::node::Node;
use crate::schema::{AttrSpec, MarkSpec, NodeSpec, Schema, SchemaSpec};

pub(crate) fn schema() -> Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            Schema::new(
                SchemaSpec::new()
                    .node("doc", NodeSpec::new().content("block+"))
                    .node("paragraph", NodeSpec::new().content("inline*").group("block"))
                    .node("blockquote", NodeSpec::new().content("block+").group("block"))
                    .node(
                        "heading",
                        NodeSpec::new()
                            .content("inline*")
                            .group("block")
                            .attr("level", AttrSpec::with_default(1)),
                    )
                    .node("horizontal_rule", NodeSpec::new().group("block"))
                    .node(
                        "code_block",
                        NodeSpec::new().content("text*").marks("").group("block").code(),
                    )
                    .node("text", NodeSpec::new().group("inline"))
                    .node(
                        "image",
                        NodeSpec::new()
                            .inline()
                            .group("inline")
                            .attr("src", AttrSpec::required()),
                    )
                    .mark("em", MarkSpec::new())
                    .mark("strong", MarkSpec::new())
                    .mark("code", MarkSpec::new().excludes("_")),
            )
            .unwrap()
        })
        .clone()
}

pub(crate) fn doc(content: Vec<Node>) -> Node {
    schema().node("doc", None, content, Vec::new()).unwrap()
}

pub(crate) fn p(content: Vec<Node>) -> Node {
    schema().node("paragraph", None, content, Vec::new()).unwrap()
}

pub(crate) fn blockquote(content: Vec<Node>) -> Node {
    schema().node("blockquote", None, content, Vec::new()).unwrap()
}

pub(crate) fn code_block(content: Vec<Node>) -> Node {
    schema().node("code_block", None, content, Vec::new()).unwrap()
}

pub(crate) fn hr() -> Node {
    schema().node("horizontal_rule", None, Fragment::empty(), Vec::new()).unwrap()
}

pub(crate) fn text(value: &str) -> Node {
    schema().text(value, Vec::new()).unwrap()
}

fn with_mark(node: Node, name: &str) -> Node {
    let mark = schema().mark(name, None).unwrap();
    node.mark(mark.add_to_set(node.marks()))
}

pub(crate) fn em(node: Node) -> Node {
    with_mark(node, "em")
}

pub(crate) fn strong(node: Node) -> Node {
    with_mark(node, "strong")
}
