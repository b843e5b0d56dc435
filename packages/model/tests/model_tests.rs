//! Document model tests against a small article schema

use scribe_model::{
    AttrSpec, JsonFormat, DocumentFormat, MarkSpec, ModelError, Node, NodeSpec, Schema, SchemaSpec, Slice,
};
use serde_json::json;

fn article_schema() -> Schema {
    Schema::new(
        SchemaSpec::new()
            .node("doc", NodeSpec::new().content("title block*"))
            .node("title", NodeSpec::new().content("text*").marks(""))
            .node("paragraph", NodeSpec::new().content("inline*").group("block"))
            .node("table", NodeSpec::new().content("table_row+").group("block"))
            .node("table_row", NodeSpec::new().content("table_cell{2}"))
            .node("table_cell", NodeSpec::new().content("paragraph"))
            .node("text", NodeSpec::new().group("inline"))
            .node(
                "image",
                NodeSpec::new().inline().group("inline").attr("src", AttrSpec::required()),
            )
            .mark("strong", MarkSpec::new())
            .mark(
                "link",
                MarkSpec::new().attr("href", AttrSpec::required()).inclusive(false),
            ),
    )
    .unwrap()
}

fn parse(schema: &Schema, value: serde_json::Value) -> Node {
    Node::from_json(schema, &value).unwrap()
}

#[test]
fn test_sequence_grammar_enforced() {
    let schema = article_schema();
    assert!(schema.validate_content("doc", &["title"]));
    assert!(schema.validate_content("doc", &["title", "paragraph", "table"]));
    assert!(!schema.validate_content("doc", &["paragraph", "title"]));
    assert!(!schema.validate_content("table_row", &["table_cell"]));
    assert!(schema.validate_content("table_row", &["table_cell", "table_cell"]));
}

#[test]
fn test_create_and_fill_builds_minimal_table() {
    let schema = article_schema();
    let table = schema.node_type("table").unwrap().create_and_fill(None).unwrap();
    assert_eq!(table.child_count(), 1);
    let row = table.child(0);
    assert_eq!(row.child_count(), 2);
    assert_eq!(row.child(0).child(0).type_name(), "paragraph");
    assert!(table.check().is_ok());
}

#[test]
fn test_marks_rejected_where_not_allowed() {
    let schema = article_schema();
    let bold = json!({
        "type": "doc",
        "content": [{"type": "title", "content": [{"type": "text", "text": "T", "marks": [{"type": "strong"}]}]}]
    });
    assert!(matches!(
        Node::from_json(&schema, &bold),
        Err(ModelError::SchemaViolation(_))
    ));
}

#[test]
fn test_required_attr_on_image() {
    let schema = article_schema();
    let missing = json!({"type": "image"});
    assert!(matches!(
        Node::from_json(&schema, &missing),
        Err(ModelError::MissingAttr { .. })
    ));
    let image = parse(&schema, json!({"type": "image", "attrs": {"src": "a.png"}}));
    assert_eq!(image.node_size(), 1);
    assert!(image.is_leaf());
}

#[test]
fn test_replace_shares_untouched_subtrees() {
    let schema = article_schema();
    let doc = parse(
        &schema,
        json!({"type": "doc", "content": [
            {"type": "title", "content": [{"type": "text", "text": "Title"}]},
            {"type": "paragraph", "content": [{"type": "text", "text": "one"}]},
            {"type": "paragraph", "content": [{"type": "text", "text": "two"}]}
        ]}),
    );
    // insert at the end of the last paragraph
    let end = doc.content_size() - 1;
    let edited = doc
        .replace(end, end, &Slice::closed(schema.text("!", vec![]).unwrap()))
        .unwrap();
    assert!(edited.child(0).ptr_eq(doc.child(0)));
    assert!(edited.child(1).ptr_eq(doc.child(1)));
    assert_eq!(edited.child(2).text_content(), "two!");
    // the original is untouched
    assert_eq!(doc.child(2).text_content(), "two");
}

#[test]
fn test_replace_rejecting_invalid_result_leaves_doc() {
    let schema = article_schema();
    let doc = parse(
        &schema,
        json!({"type": "doc", "content": [
            {"type": "title", "content": [{"type": "text", "text": "Title"}]}
        ]}),
    );
    // deleting the title would leave the doc without its required first child
    let result = doc.replace(0, doc.content_size(), &Slice::empty());
    assert!(result.is_err());
    assert_eq!(doc.text_content(), "Title");
}

#[test]
fn test_slice_and_replace_restore() {
    let schema = article_schema();
    let doc = parse(
        &schema,
        json!({"type": "doc", "content": [
            {"type": "title", "content": [{"type": "text", "text": "T"}]},
            {"type": "paragraph", "content": [{"type": "text", "text": "abc"}]},
            {"type": "paragraph", "content": [{"type": "text", "text": "def"}]}
        ]}),
    );
    // from after "ab" to after "d"
    let (from, to) = (6, 10);
    let removed = doc.slice(from, to).unwrap();
    let deleted = doc.replace(from, to, &Slice::empty()).unwrap();
    assert_eq!(deleted.child_count(), 2);
    assert_eq!(deleted.child(1).text_content(), "abef");

    let restored = deleted.replace(from, from, &removed).unwrap();
    assert_eq!(restored, doc);
}

#[test]
fn test_link_mark_not_inclusive() {
    let schema = article_schema();
    let doc = parse(
        &schema,
        json!({"type": "doc", "content": [
            {"type": "title", "content": [{"type": "text", "text": "T"}]},
            {"type": "paragraph", "content": [
                {"type": "text", "text": "go", "marks": [{"type": "link", "attrs": {"href": "x"}}]},
                {"type": "text", "text": " on"}
            ]}
        ]}),
    );
    // end of the linked text: link does not extend
    let pos = doc.resolve(6).unwrap();
    assert!(pos.marks().is_empty());
    let inside = doc.resolve(5).unwrap();
    assert_eq!(inside.marks().len(), 1);
}

#[test]
fn test_text_between_with_separators() {
    let schema = article_schema();
    let doc = parse(
        &schema,
        json!({"type": "doc", "content": [
            {"type": "title", "content": [{"type": "text", "text": "Head"}]},
            {"type": "paragraph", "content": [
                {"type": "text", "text": "a"},
                {"type": "image", "attrs": {"src": "i.png"}},
                {"type": "text", "text": "b"}
            ]}
        ]}),
    );
    assert_eq!(
        doc.text_between(0, doc.content_size(), "\n", "[img]"),
        "Head\na[img]b"
    );
}

#[test]
fn test_json_format_round_trip() {
    let schema = article_schema();
    let source = r#"{"type":"doc","content":[{"type":"title","content":[{"type":"text","text":"Hi"}]}]}"#;
    let format = JsonFormat::default();
    let doc = format.parse(&schema, source).unwrap();
    assert_eq!(format.serialize(&doc).unwrap(), source);
}
