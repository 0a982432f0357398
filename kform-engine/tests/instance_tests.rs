//! End-to-end tests for mounted form instances.

use kform_engine::{
    AsyncErrors, DebounceMode, EngineError, FormConfig, FormHooks, FormInstance, InputControls,
    InputEvent, ManualScheduler, SubmitOutcome,
};
use kform_model::validators::required;
use kform_model::{FieldKind, FieldSchema, FieldTypeRegistry, Fields, FormSchema};
use kform_store::{ScopeContext, Store, StoreError};
use kform_types::{reducer_fn, Action, ScopePath};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct RecordingControls {
    focused: RefCell<Vec<String>>,
    files: RefCell<Fields>,
}

impl InputControls for RecordingControls {
    fn focus(&self, field_id: &str) {
        self.focused.borrow_mut().push(field_id.to_string());
    }

    fn submitted_value(&self, field_id: &str) -> Option<Value> {
        self.files.borrow().get(field_id).cloned()
    }
}

struct Decline;

impl FormHooks for Decline {
    fn on_submit(&self, _values: &Fields) -> bool {
        false
    }

    fn on_cancel(&self) -> bool {
        false
    }
}

fn counter_types() -> FieldTypeRegistry {
    let counter = reducer_fn(
        || json!({"counter": 0}),
        |mut state: Value, action: &Action| {
            if action.kind == "INC" {
                let next = state["counter"].as_i64().unwrap_or(0) + 1;
                state["counter"] = json!(next);
            }
            state
        },
    );
    FieldTypeRegistry::with_builtins().with("expand", FieldKind::composite(Rc::new(counter)))
}

struct Harness {
    store: Store,
    scheduler: Rc<ManualScheduler>,
    controls: Rc<RecordingControls>,
}

impl Harness {
    fn new() -> Self {
        init_tracing();
        Self {
            store: Store::new(),
            scheduler: Rc::new(ManualScheduler::new()),
            controls: Rc::new(RecordingControls::default()),
        }
    }

    fn form(
        &self,
        scope: &[&str],
        fields: Vec<FieldSchema>,
        types: FieldTypeRegistry,
    ) -> FormInstance {
        FormInstance::new(
            "form0",
            ScopeContext::new(self.store.clone(), ScopePath::from(scope)),
            Arc::new(FormSchema::new(fields).unwrap()),
            Rc::new(types),
            self.scheduler.clone(),
        )
        .with_controls(self.controls.clone())
    }

    fn focused(&self) -> Vec<String> {
        self.controls.focused.borrow().clone()
    }
}

fn to_int(raw: Value) -> Value {
    raw.as_str()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(Value::from)
        .unwrap_or(raw)
}

// ── Mount / unmount ──────────────────────────────────────────────

#[test]
fn mount_materializes_initial_state() {
    let h = Harness::new();
    let form = h.form(
        &["app", "form0"],
        vec![FieldSchema::new("name").default_value("Jaśko")],
        FieldTypeRegistry::with_builtins(),
    );

    let snapshot = form.mount().unwrap();
    assert!(!snapshot.dirty);
    assert_eq!(snapshot.fields.get("name"), Some(&json!("Jaśko")));
    assert_eq!(h.store.get_state()["app"]["form0"]["fields"]["name"], json!("Jaśko"));
    assert!(form.is_mounted());
}

#[test]
fn mount_focuses_first_visible_field() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![
            FieldSchema::new("hidden").visible(|_| false),
            FieldSchema::new("name"),
        ],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();
    assert_eq!(h.focused(), vec!["name"]);
}

#[test]
fn mount_focus_can_be_disabled() {
    let h = Harness::new();
    let form = h
        .form(&["f"], vec![FieldSchema::new("name")], FieldTypeRegistry::with_builtins())
        .with_config(FormConfig { focus_first_on_mount: false, ..FormConfig::default() });
    form.mount().unwrap();
    assert!(h.focused().is_empty());
}

#[test]
fn duplicate_scope_is_rejected() {
    let h = Harness::new();
    let first = h.form(&["f"], vec![FieldSchema::new("a")], FieldTypeRegistry::with_builtins());
    let second = h.form(&["f"], vec![FieldSchema::new("b")], FieldTypeRegistry::with_builtins());
    first.mount().unwrap();

    let err = second.mount().unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::DuplicateRegistration(_))));
    assert!(!second.is_mounted());
    assert_eq!(h.store.reducer_count(), 1);
}

#[test]
fn unmount_removes_registration_and_state() {
    let h = Harness::new();
    let form = h.form(
        &["app", "form0"],
        vec![FieldSchema::new("name")],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();
    form.unmount();

    assert_eq!(h.store.reducer_count(), 0);
    assert_eq!(h.store.select(&ScopePath::from(["app", "form0"])), None);
    assert!(matches!(form.set_field("name", json!("x"), None), Err(EngineError::NotMounted(_))));

    // second unmount is a no-op
    form.unmount();
}

#[test]
fn sibling_forms_are_isolated() {
    let h = Harness::new();
    let a = h.form(
        &["app", "a"],
        vec![FieldSchema::new("name")],
        FieldTypeRegistry::with_builtins(),
    );
    let b = h.form(
        &["app", "b"],
        vec![FieldSchema::new("name")],
        FieldTypeRegistry::with_builtins(),
    );
    a.mount().unwrap();
    b.mount().unwrap();

    a.set_field("name", json!("Ala"), None).unwrap();
    assert_eq!(a.model().fields.get("name"), Some(&json!("Ala")));
    assert_eq!(b.model().fields.get("name"), Some(&json!("")));
    assert!(!b.model().dirty);
}

// ── Submit ───────────────────────────────────────────────────────

#[test]
fn required_field_blocks_submit_then_shows_error() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("name").validate(required())],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let store = h.store.clone();
    h.store.subscribe(move || {
        let state = store.select(&ScopePath::from(["f"])).unwrap_or(Value::Null);
        sink.borrow_mut().push(state["submitDirty"].clone());
    });

    let errors = form.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(form.grouped_fields()["default"][0].error, None);

    let outcome = form.handle_submit().unwrap();
    assert!(matches!(&outcome, SubmitOutcome::Blocked { focused: Some(id), .. } if id == "name"));
    assert_eq!(*seen.borrow(), vec![json!(true)]);
    assert!(form.model().submit_dirty);

    let shown = form.grouped_fields()["default"][0].error.clone();
    assert!(shown.is_some_and(|e| !e.is_empty()));
    assert_eq!(h.focused(), vec!["name", "name"]);
}

#[test]
fn valid_submit_dispatches_values_and_resets() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![
            FieldSchema::new("name").default_value("Jaśko"),
            FieldSchema::new("avatar").field_type("file"),
        ],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();
    form.set_field("name", json!("Staś"), None).unwrap();
    h.controls.files.borrow_mut().insert("avatar".into(), json!(["me.png"]));

    let outcome = form.handle_submit().unwrap();
    let expected: Fields = [
        ("avatar".to_string(), json!(["me.png"])),
        ("name".to_string(), json!("Staś")),
    ]
    .into_iter()
    .collect();
    assert_eq!(outcome, SubmitOutcome::Submitted(expected));

    let model = form.model();
    assert!(!model.dirty);
    assert_eq!(model.fields.get("name"), Some(&json!("Jaśko")));
}

#[test]
fn submit_without_reset_keeps_values() {
    let h = Harness::new();
    let form = h
        .form(&["f"], vec![FieldSchema::new("name")], FieldTypeRegistry::with_builtins())
        .with_config(FormConfig { reset_on_submit: false, ..FormConfig::default() });
    form.mount().unwrap();
    form.set_field("name", json!("Staś"), None).unwrap();

    form.handle_submit().unwrap();
    let model = form.model();
    assert!(!model.dirty);
    assert_eq!(model.fields.get("name"), Some(&json!("Staś")));
}

#[test]
fn hooks_can_intercept_submit_and_cancel() {
    let h = Harness::new();
    let form = h
        .form(&["f"], vec![FieldSchema::new("name")], FieldTypeRegistry::with_builtins())
        .with_hooks(Rc::new(Decline));
    form.mount().unwrap();
    form.set_field("name", json!("x"), None).unwrap();

    assert_eq!(form.handle_submit().unwrap(), SubmitOutcome::Intercepted);
    assert!(!form.handle_cancel().unwrap());
    assert!(form.model().dirty);
}

#[test]
fn cancel_restores_defaults() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("name").default_value("A")],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();
    form.set_field("name", json!("B"), None).unwrap();

    assert!(form.handle_cancel().unwrap());
    let model = form.model();
    assert_eq!(model.fields.get("name"), Some(&json!("A")));
    assert!(!model.dirty);
}

// ── Input handling ───────────────────────────────────────────────

#[test]
fn debounced_input_commits_parsed_value() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("age").debounce(Duration::from_millis(300)).parse(to_int)],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();

    form.handle_change("age", InputEvent::Text("42".into())).unwrap();
    let model = form.model();
    assert_eq!(model.raw.get("age"), Some(&json!("42")));
    assert!(model.is_debouncing("age"));
    assert!(!model.dirty);
    assert_eq!(form.pending_commits(), vec!["age"]);

    h.scheduler.advance(Duration::from_millis(300));
    let model = form.model();
    assert_eq!(model.fields.get("age"), Some(&json!(42)));
    assert!(!model.is_debouncing("age"));
    assert!(model.dirty);
    assert!(form.pending_commits().is_empty());
}

#[test]
fn last_keystroke_wins() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("q").debounce(Duration::from_millis(300))],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();

    form.handle_change("q", InputEvent::Text("k".into())).unwrap();
    h.scheduler.advance(Duration::from_millis(200));
    form.handle_change("q", InputEvent::Text("ko".into())).unwrap();
    assert_eq!(h.scheduler.pending(), 1);

    h.scheduler.advance(Duration::from_millis(200));
    assert_eq!(form.model().fields.get("q"), Some(&json!("")));

    h.scheduler.advance(Duration::from_millis(100));
    assert_eq!(form.model().fields.get("q"), Some(&json!("ko")));
}

#[test]
fn unchanged_input_is_not_dispatched() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("name").default_value("A")],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();

    form.handle_change("name", InputEvent::Text("A".into())).unwrap();
    assert!(!form.model().dirty);
    form.handle_change("name", InputEvent::Text("B".into())).unwrap();
    assert!(form.model().dirty);
}

#[test]
fn vetoed_debounced_change_dispatches_nothing() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![
            FieldSchema::new("q")
                .default_value("keep")
                .debounce(Duration::from_millis(300))
                .on_change(|ctx| ctx.fields.get("q").cloned()),
        ],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();

    let dispatched = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&dispatched);
    h.store.subscribe(move || *counter.borrow_mut() += 1);

    form.handle_change("q", InputEvent::Text("vetoed".into())).unwrap();
    let model = form.model();
    assert!(!model.is_debouncing("q"));
    assert!(model.raw.is_empty());
    assert!(form.pending_commits().is_empty());
    assert_eq!(h.scheduler.pending(), 0);

    h.scheduler.advance(Duration::from_millis(300));
    let model = form.model();
    assert_eq!(model.fields.get("q"), Some(&json!("keep")));
    assert!(!model.dirty);
    assert_eq!(*dispatched.borrow(), 0);
}

#[test]
fn reverting_input_closes_debounce_window() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("q").debounce(Duration::from_millis(300))],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();

    form.handle_change("q", InputEvent::Text("ab".into())).unwrap();
    assert!(form.model().is_debouncing("q"));
    form.handle_change("q", InputEvent::Text(String::new())).unwrap();

    let model = form.model();
    assert!(!model.is_debouncing("q"));
    assert!(model.raw.is_empty());
    assert_eq!(h.scheduler.pending(), 0);

    h.scheduler.advance(Duration::from_millis(300));
    let model = form.model();
    assert_eq!(model.fields.get("q"), Some(&json!("")));
    assert!(!model.dirty);
}

#[test]
fn checkbox_commits_checked_state() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("agree").field_type("checkbox").default_value(false)],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();
    form.handle_change("agree", InputEvent::Checked(true)).unwrap();
    assert_eq!(form.model().fields.get("agree"), Some(&json!(true)));
}

#[test]
fn timer_after_unmount_is_dropped() {
    let h = Harness::new();
    let form = h.form(
        &["f"],
        vec![FieldSchema::new("q").debounce(Duration::from_millis(300))],
        FieldTypeRegistry::with_builtins(),
    );
    form.mount().unwrap();
    form.handle_change("q", InputEvent::Text("late".into())).unwrap();
    form.unmount();

    assert_eq!(h.scheduler.advance(Duration::from_millis(300)), 1);
    assert_eq!(h.store.select(&ScopePath::from(["f"])), None);
}

#[test]
fn load_values_sets_new_defaults() {
    let h = Harness::new();
    let form = h.form(&["f"], vec![FieldSchema::new("name")], FieldTypeRegistry::with_builtins());
    form.mount().unwrap();

    let values: Fields = [("name".to_string(), json!("Zosia"))].into_iter().collect();
    form.load_values(values).unwrap();
    form.set_field("name", json!("other"), Some(DebounceMode::Start)).unwrap();
    form.handle_cancel().unwrap();
    assert_eq!(form.model().fields.get("name"), Some(&json!("Zosia")));
}

// ── Composite fields ─────────────────────────────────────────────

#[test]
fn composite_counter_routes_to_sub_state() {
    let h = Harness::new();
    let form = h.form(
        &["app", "form0"],
        vec![
            FieldSchema::new("name").default_value("Jaśko"),
            FieldSchema::new("job").field_type("expand"),
        ],
        counter_types(),
    );
    let snapshot = form.mount().unwrap();
    assert_eq!(snapshot.sub_states.get("job"), Some(&json!({"counter": 0})));
    let job_scope = ScopePath::from(["app", "form0", "job"]);
    assert!(h.store.is_registered(&job_scope));

    let fields_before = form.model().fields;
    h.store.dispatch(Action::scoped(job_scope.clone(), "INC"));
    h.store.dispatch(Action::scoped(job_scope.clone(), "INC"));

    let model = form.model();
    assert_eq!(model.sub_states.get("job"), Some(&json!({"counter": 2})));
    assert_eq!(model.fields, fields_before);
    assert!(!model.dirty);
    assert_eq!(h.store.select(&job_scope), Some(json!({"counter": 2})));

    form.unmount();
    assert!(!h.store.is_registered(&job_scope));
    assert_eq!(h.store.dispatch(Action::scoped(job_scope, "INC")), 0);
    assert_eq!(h.store.get_state()["app"], json!({}));
}

#[test]
fn composite_reset_restores_initial_sub_state() {
    let h = Harness::new();
    let form = h.form(&["f"], vec![FieldSchema::new("job").field_type("expand")], counter_types());
    form.mount().unwrap();

    form.dispatch_sub_state("job", Action::new("INC"), Some(json!("dev"))).unwrap();
    let model = form.model();
    assert_eq!(model.sub_states.get("job"), Some(&json!({"counter": 1})));
    assert_eq!(model.fields.get("job"), Some(&json!("dev")));

    form.handle_cancel().unwrap();
    assert_eq!(form.model().sub_states.get("job"), Some(&json!({"counter": 0})));
}

#[test]
fn nested_form_under_plain_field_keeps_own_state() {
    let h = Harness::new();
    let parent = h.form(
        &["f"],
        vec![FieldSchema::new("address").default_value("none")],
        FieldTypeRegistry::with_builtins(),
    );
    parent.mount().unwrap();

    let child = FormInstance::new(
        "address",
        parent.child_context("address"),
        Arc::new(FormSchema::new(vec![FieldSchema::new("city")]).unwrap()),
        Rc::new(FieldTypeRegistry::with_builtins()),
        h.scheduler.clone(),
    );
    child.mount().unwrap();
    child.set_field("city", json!("Kraków"), None).unwrap();

    assert_eq!(h.store.get_state()["f"]["address"]["fields"]["city"], json!("Kraków"));
    assert!(parent.model().sub_states.is_empty());
    assert!(!parent.model().dirty);

    // Resetting the parent leaves the nested form alone.
    parent.set_field("address", json!("set"), None).unwrap();
    assert!(parent.handle_cancel().unwrap());
    assert_eq!(parent.model().fields.get("address"), Some(&json!("none")));
    assert!(parent.model().sub_states.is_empty());
    assert_eq!(child.model().fields.get("city"), Some(&json!("Kraków")));

    child.unmount();
    assert_eq!(h.store.get_state()["f"].get("address"), None);
    assert!(parent.is_mounted());
}

// ── Async errors ─────────────────────────────────────────────────

#[test]
fn async_errors_focus_and_show() {
    let h = Harness::new();
    let form = h
        .form(
            &["f"],
            vec![FieldSchema::new("name"), FieldSchema::new("email")],
            FieldTypeRegistry::with_builtins(),
        )
        .with_config(FormConfig { focus_first_on_mount: false, ..FormConfig::default() });
    form.mount().unwrap();

    let mut errors: AsyncErrors = [("email", "Already registered")].into_iter().collect();
    errors.set_general("Could not save");
    form.set_async_errors(errors);

    assert_eq!(h.focused(), vec!["email"]);
    assert_eq!(form.generic_error().as_deref(), Some("Could not save"));
    let groups = form.grouped_fields();
    assert_eq!(groups["default"][1].error.as_deref(), Some("Already registered"));

    // async-only errors do not block submit
    assert!(matches!(form.handle_submit().unwrap(), SubmitOutcome::Submitted(_)));
}

#[test]
fn grouped_fields_are_memoized_by_revision() {
    let h = Harness::new();
    let form = h
        .form(&["f"], vec![FieldSchema::new("name")], FieldTypeRegistry::with_builtins())
        .with_config(FormConfig { focus_first_on_mount: false, ..FormConfig::default() });
    form.mount().unwrap();

    form.grouped_fields();
    form.grouped_fields();
    assert_eq!(form.visible_computations(), 1);

    form.set_field("name", json!("x"), None).unwrap();
    form.grouped_fields();
    assert_eq!(form.visible_computations(), 2);
}

#[test]
fn pending_input_does_not_recompute_visible_fields() {
    let h = Harness::new();
    let form = h
        .form(
            &["f"],
            vec![FieldSchema::new("q").debounce(Duration::from_millis(300))],
            FieldTypeRegistry::with_builtins(),
        )
        .with_config(FormConfig { focus_first_on_mount: false, ..FormConfig::default() });
    form.mount().unwrap();
    form.grouped_fields();

    form.handle_change("q", InputEvent::Text("a".into())).unwrap();
    let groups = form.grouped_fields();
    assert_eq!(groups["default"][0].value, json!("a"));
    assert_eq!(form.visible_computations(), 1);

    h.scheduler.advance(Duration::from_millis(300));
    form.grouped_fields();
    assert_eq!(form.visible_computations(), 2);
}

#[test]
fn from_fields_rejects_duplicate_ids() {
    let h = Harness::new();
    let result = FormInstance::from_fields(
        "dup",
        ScopeContext::root(h.store.clone()),
        vec![FieldSchema::new("a"), FieldSchema::new("a")],
        Rc::new(FieldTypeRegistry::with_builtins()),
        h.scheduler.clone(),
    );
    assert!(matches!(result, Err(EngineError::Schema(_))));
}
