use kform_model::{FieldKind, FieldSchema, FieldTypeRegistry, FormSchema, InputKind, SchemaMismatch};
use kform_types::{reducer_fn, Action, SharedReducer};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::rc::Rc;

fn counter() -> SharedReducer {
    Rc::new(reducer_fn(|| json!({"counter": 0}), |state: Value, _: &Action| state))
}

// ── Builtins ─────────────────────────────────────────────────────

#[test]
fn builtins_cover_plain_inputs() {
    let registry = FieldTypeRegistry::with_builtins();
    assert_eq!(registry.get("text").map(|k| k.input), Some(InputKind::Text));
    assert_eq!(registry.get("checkbox").map(|k| k.input), Some(InputKind::Checkbox));
    assert_eq!(registry.get("file").map(|k| k.input), Some(InputKind::File));
    assert!(!registry.contains("expand"));
}

#[test]
fn composite_kind_carries_reducer() {
    let kind = FieldKind::composite(counter());
    assert_eq!(kind.input, InputKind::Composite);
    assert!(kind.has_reducer());
    assert!(!FieldKind::text().has_reducer());
}

#[test]
fn register_replaces_existing() {
    let mut registry = FieldTypeRegistry::with_builtins();
    let previous = registry.register("text", FieldKind::checkbox());
    assert_eq!(previous.map(|k| k.input), Some(InputKind::Text));
    assert_eq!(registry.get("text").map(|k| k.input), Some(InputKind::Checkbox));
}

// ── Resolution ───────────────────────────────────────────────────

#[test]
fn resolve_falls_back_to_text() {
    let registry = FieldTypeRegistry::with_builtins();
    let kind = registry.resolve(&FieldSchema::new("job").field_type("expand"));
    assert_eq!(kind.input, InputKind::Text);
    assert!(!kind.has_reducer());
}

#[test]
fn reducer_for_composite_field() {
    let registry =
        FieldTypeRegistry::with_builtins().with("expand", FieldKind::composite(counter()));
    let reducer = registry.reducer_for(&FieldSchema::new("job").field_type("expand")).unwrap();
    assert_eq!(reducer.init(), json!({"counter": 0}));
    assert!(registry.reducer_for(&FieldSchema::new("name")).is_none());
}

#[test]
fn check_reports_missing_types() {
    let registry = FieldTypeRegistry::with_builtins();
    let schema = FormSchema::new(vec![
        FieldSchema::new("name"),
        FieldSchema::new("job").field_type("expand"),
        FieldSchema::new("when").field_type("date"),
    ])
    .unwrap();

    let mismatches = registry.check(&schema);
    assert_eq!(
        mismatches,
        vec![
            SchemaMismatch { field_id: "job".into(), field_type: "expand".into() },
            SchemaMismatch { field_id: "when".into(), field_type: "date".into() },
        ]
    );
    assert_eq!(
        mismatches[0].to_string(),
        "field 'job' declares unregistered type 'expand'"
    );
}

#[test]
fn check_passes_when_all_registered() {
    let registry =
        FieldTypeRegistry::with_builtins().with("expand", FieldKind::composite(counter()));
    let schema = FormSchema::new(vec![FieldSchema::new("job").field_type("expand")]).unwrap();
    assert!(registry.check(&schema).is_empty());
}

#[test]
fn input_kind_serializes_snake_case() {
    assert_eq!(serde_json::to_value(InputKind::Checkbox).unwrap(), json!("checkbox"));
}
