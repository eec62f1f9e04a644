use serde_json::json;
use vellum::patch::{apply_all, Origin, Patch};
use vellum::wire::{from_wire, to_wire, WirePatch};
use vellum_path::{parse_match_path, Path};

fn path(text: &str) -> Path {
    parse_match_path(text).expect("test path should parse")
}

fn edits() -> Vec<Patch> {
    vec![
        Patch::set(path("title"), json!("Release notes")),
        Patch::set(path("slug"), json!("release-notes")),
        Patch::unset(path("draft")),
        Patch::insert_after(
            path("body[_key==\"intro\"]"),
            vec![json!({"_key": "details", "text": "More"})],
        ),
        Patch::inc(path("stats.revisions"), 1),
    ]
}

#[test]
fn wire_transport_preserves_the_effect_of_a_batch() {
    let doc = json!({
        "title": "Old",
        "draft": true,
        "body": [{"_key": "intro", "text": "Hi"}],
        "stats": {"revisions": 3},
    });

    let direct = apply_all(Some(doc.clone()), &edits()).expect("direct apply");

    let wire = to_wire(&edits()).expect("encode");
    let transported: Vec<WirePatch> = wire
        .iter()
        .map(|batch| WirePatch::from_value(&batch.to_value()).expect("decode"))
        .collect();
    let expanded = from_wire(Origin::Remote, &transported).expect("expand");
    let via_wire = apply_all(Some(doc), &expanded).expect("apply expanded");

    assert_eq!(direct, via_wire);
}

#[test]
fn expansion_tags_the_requested_origin() {
    let wire = to_wire(&edits()).expect("encode");
    let local = from_wire(Origin::Local, &wire).expect("expand");
    assert!(local.iter().all(|p| p.origin == Some(Origin::Local)));
    let remote = from_wire(Origin::Remote, &wire).expect("expand");
    assert!(remote.iter().all(|p| p.origin == Some(Origin::Remote)));
}

#[test]
fn rewrites_of_one_path_stay_ordered_across_batches() {
    let patches = vec![
        Patch::set(path("title"), json!("first")),
        Patch::set(path("title"), json!("second")),
    ];
    let wire = to_wire(&patches).expect("encode");
    assert_eq!(wire.len(), 2, "a map cannot hold the same path twice");

    let expanded = from_wire(Origin::Local, &wire).expect("expand");
    let result = apply_all(Some(json!({})), &expanded).expect("apply");
    assert_eq!(result.unwrap()["title"], json!("second"));
}

#[test]
fn insert_batches_carry_position_reference_and_items() {
    let patches = vec![Patch::insert_before(
        path("rows[0]"),
        vec![json!({"cells": []})],
    )];
    let wire = to_wire(&patches).expect("encode");
    assert_eq!(
        wire[0].to_value(),
        json!({"insert": {"before": "rows[0]", "items": [{"cells": []}]}})
    );
}

#[test]
fn foreign_wire_keys_are_ignored() {
    let raw = json!({
        "id": "doc-9",
        "ifRevisionID": "rev-3",
        "set": {"title": "From elsewhere"},
    });
    let batch = WirePatch::from_value(&raw).expect("decode should tolerate extras");
    let expanded = from_wire(Origin::Remote, &[batch]).expect("expand");
    assert_eq!(expanded.len(), 1);
    assert_eq!(expanded[0].path_string(), "title");
}

#[test]
fn local_only_operations_refuse_the_wire() {
    let err = to_wire(&[Patch::move_item(path("body"), 0, 1)])
        .expect_err("move has no wire form");
    assert_eq!(err.to_string(), "move patches have no wire representation");
}
