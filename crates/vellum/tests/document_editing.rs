use serde_json::{json, Value};
use std::sync::Arc;
use vellum::container::ValueNode;
use vellum::key::ensure_array_keys_deep;
use vellum::patch::Patch;
use vellum::schema::{ArrayType, Field, ObjectType, PrimitiveKind, PrimitiveType, ReferenceType, SchemaType};
use vellum::state::DocumentState;
use vellum::validation::Level;
use vellum_path::{parse_match_path, Path};

fn path(text: &str) -> Path {
    parse_match_path(text).expect("test path should parse")
}

fn span() -> SchemaType {
    SchemaType::object(
        ObjectType::new("span").with_fields(vec![Field::new("text", SchemaType::string())]),
    )
}

fn block() -> SchemaType {
    SchemaType::object(ObjectType::new("block").with_fields(vec![
        Field::new("style", SchemaType::string()),
        Field::new("children", SchemaType::array(ArrayType::new("children", vec![span()]))),
    ]))
}

fn article() -> SchemaType {
    SchemaType::object(ObjectType::new("article").with_fields(vec![
        Field::new(
            "title",
            SchemaType::primitive(PrimitiveType::new("title", PrimitiveKind::String).required()),
        ),
        Field::new("subtitle", SchemaType::string()),
        Field::new("body", SchemaType::array(ArrayType::new("body", vec![block()]))),
        Field::new(
            "author",
            SchemaType::reference(ReferenceType::new("author", vec!["person".into()])),
        ),
    ]))
}

fn draft() -> Value {
    json!({
        "_type": "article",
        "title": "On patches",
        "body": [
            {
                "_key": "b1",
                "_type": "block",
                "style": "normal",
                "children": [{"_key": "s1", "_type": "span", "text": "Hello"}],
            },
        ],
    })
}

#[test]
fn empty_documents_are_addressable_through_the_schema() {
    let state = DocumentState::new(None, article());
    assert_eq!(state.value(), None);

    let state = state
        .apply(&Patch::set(path("title"), json!("Fresh")))
        .expect("declared fields of an empty document accept writes");
    assert_eq!(state.value(), Some(json!({"title": "Fresh"})));
}

#[test]
fn every_missing_required_field_is_reported() {
    let ty = SchemaType::object(ObjectType::new("entry").with_fields(vec![
        Field::new(
            "title",
            SchemaType::primitive(PrimitiveType::new("title", PrimitiveKind::String).required()),
        ),
        Field::new(
            "rating",
            SchemaType::primitive(PrimitiveType::new("rating", PrimitiveKind::Number).required()),
        ),
    ]));
    let result = DocumentState::new(Some(&json!({})), ty).validate();

    assert_eq!(result.error_count(), 2);
    assert!(result.fields.contains_key("title"));
    assert!(result.fields.contains_key("rating"));
}

#[test]
fn undeclared_fields_survive_and_warn() {
    let raw = json!({"title": "Kept", "legacy": {"imported": true}});
    let state = DocumentState::new(Some(&raw), article());

    assert_eq!(state.value(), Some(raw));

    let result = state.validate();
    let legacy = result.fields.get("legacy").expect("legacy should be flagged");
    assert_eq!(legacy.messages[0].id, "unknown-field");
    assert_eq!(legacy.messages[0].level, Level::Warning);
    assert!(result.is_valid(), "unknown fields warn, they do not invalidate");
}

#[test]
fn inserted_items_get_keys_assigned() {
    let state = DocumentState::new(Some(&draft()), article());
    let unkeyed = json!({"_type": "block", "style": "normal", "children": []});
    let state = state
        .apply(&Patch::insert_after(path("body[-1]"), vec![unkeyed]))
        .expect("insert should apply");

    let body = state.value().unwrap()["body"].clone();
    let key = body[1]["_key"].as_str().expect("inserted item should have a key");
    assert!(!key.is_empty());
    assert_ne!(key, "b1");
}

#[test]
fn deep_key_assignment_clears_missing_key_warnings() {
    let nested = json!({
        "_type": "block",
        "style": "quote",
        "children": [{"_type": "span", "text": "raw"}],
    });
    let keyed = ensure_array_keys_deep(json!([nested]));

    let state = DocumentState::new(Some(&draft()), article())
        .apply(&Patch::insert_after(
            path("body[-1]"),
            keyed.as_array().expect("array fixture").clone(),
        ))
        .expect("insert should apply");

    assert!(state.validate().is_blank(), "all items carry keys");
}

#[test]
fn missing_and_duplicate_keys_are_warned_about() {
    let raw = json!({
        "title": "T",
        "body": [
            {"_key": "dup", "_type": "block", "style": "normal", "children": []},
            {"_type": "block", "style": "normal", "children": []},
            {"_key": "dup", "_type": "block", "style": "normal", "children": []},
        ],
    });
    let result = DocumentState::new(Some(&raw), article()).validate();
    let body = result.fields.get("body").expect("body should be flagged");

    let item = body.items.get(&1).expect("unkeyed item flagged");
    assert_eq!(item.messages[0].id, "missing-key");
    assert!(body.messages.iter().any(|m| m.id == "duplicate-keys"));
}

#[test]
fn editing_one_field_shares_the_rest_of_the_tree() {
    let before = DocumentState::new(Some(&draft()), article());
    let after = before
        .apply(&Patch::set(path("title"), json!("Renamed")))
        .expect("set should apply");

    let ValueNode::Object(before_root) = before.root() else {
        panic!("root should be an object container");
    };
    let ValueNode::Object(after_root) = after.root() else {
        panic!("root should be an object container");
    };
    let before_body = before_root.field_node("body").expect("body node");
    let after_body = after_root.field_node("body").expect("body node");
    assert!(Arc::ptr_eq(before_body, after_body));
}

#[test]
fn empty_leaves_are_dropped_from_the_persisted_form() {
    let state = DocumentState::new(Some(&json!({"title": "T"})), article())
        .apply(&Patch::set(path("subtitle"), json!("")))
        .expect("set should apply");

    assert_eq!(state.value(), Some(json!({"title": "T"})));
}

#[test]
fn deep_edits_address_elements_by_key() {
    let state = DocumentState::new(Some(&draft()), article())
        .apply(&Patch::set(
            path("body[_key==\"b1\"].children[_key==\"s1\"].text"),
            json!("Hello again"),
        ))
        .expect("deep set should apply");

    let value = state.value().unwrap();
    assert_eq!(value["body"][0]["children"][0]["text"], json!("Hello again"));
}

#[test]
fn unset_by_key_removes_the_element() {
    let state = DocumentState::new(Some(&draft()), article())
        .apply(&Patch::unset(path("body[_key==\"b1\"]")))
        .expect("unset should apply");

    let value = state.value().unwrap();
    assert!(value.get("body").is_none(), "an emptied array is dropped");
}

#[test]
fn references_validate_their_pointer() {
    let raw = json!({"title": "T", "author": {"_type": "reference", "note": "lost"}});
    let result = DocumentState::new(Some(&raw), article()).validate();
    let author = result.fields.get("author").expect("author flagged");
    assert_eq!(author.messages[0].id, "invalid-reference");

    let raw = json!({"title": "T", "author": {"_type": "reference", "_ref": "person-1"}});
    assert!(DocumentState::new(Some(&raw), article()).validate().is_blank());
}

#[test]
fn mismatched_values_are_kept_and_flagged_until_overwritten() {
    let raw = json!({"title": "T", "body": "not an array"});
    let state = DocumentState::new(Some(&raw), article());

    assert_eq!(state.value().unwrap()["body"], json!("not an array"));
    let result = state.validate();
    assert_eq!(result.fields.get("body").expect("body flagged").messages[0].id, "invalid-type");

    let healed = state
        .apply(&Patch::set(path("body"), json!([])))
        .expect("overwrite should apply");
    assert!(healed.validate().fields.get("body").is_none());
}
