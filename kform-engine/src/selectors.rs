//! Field derivation.
//!
//! Turns schema + model into what the rendering layer paints: the visible
//! fields, grouped, each with its resolved value, display value, error and
//! props. Also resolves raw input into the value to commit.

use crate::model::FormModel;
use crate::validation::{resolve_error, FieldError};
use kform_model::{ChangeContext, FieldSchema, FieldTypeRegistry, FormSchema, InputKind};
use kform_types::ScopePath;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fields whose `visible` predicate holds for the committed values, in
/// schema order.
pub fn visible_fields(schema: &FormSchema, model: &FormModel) -> Vec<Arc<FieldSchema>> {
    schema
        .iter()
        .filter(|field| field.is_visible(&model.fields))
        .cloned()
        .collect()
}

/// Memoized [`visible_fields`].
///
/// Keyed by the schema generation and the model revision; recomputes only
/// when either changes.
#[derive(Debug, Default)]
pub struct VisibleFieldsCache {
    key: Option<(u64, u64)>,
    fields: Vec<Arc<FieldSchema>>,
    computations: u64,
}

impl VisibleFieldsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, schema: &FormSchema, model: &FormModel) -> &[Arc<FieldSchema>] {
        let key = (schema.generation(), model.revision);
        if self.key != Some(key) {
            self.fields = visible_fields(schema, model);
            self.key = Some(key);
            self.computations += 1;
        }
        &self.fields
    }

    /// Drops the cached result.
    pub fn invalidate(&mut self) {
        self.key = None;
    }

    /// How many times the visible set was computed.
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

/// Everything the rendering layer needs for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,
    /// Control id, `<formName>-<fieldId>`.
    pub input_id: String,
    pub title: String,
    pub field_type: String,
    pub input: InputKind,
    /// Raw input while debouncing, committed value otherwise.
    pub value: Value,
    /// Raw input while debouncing, formatted committed value otherwise.
    pub display_value: Value,
    pub error: Option<String>,
    pub props: Map<String, Value>,
    /// Scope of the field's own sub-state, for composite fields.
    pub scope: Option<ScopePath>,
}

/// Inputs for building [`FieldDescriptor`]s.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub form_name: &'a str,
    pub scope: &'a ScopePath,
    pub model: &'a FormModel,
    pub types: &'a FieldTypeRegistry,
    pub errors: &'a [FieldError],
    pub args: &'a Value,
}

impl FieldView<'_> {
    pub fn descriptor(&self, field: &FieldSchema) -> FieldDescriptor {
        let kind = self.types.resolve(field);
        let committed = self.model.fields.get(&field.id).cloned().unwrap_or(Value::Null);
        let (value, display_value) = match self.model.raw.get(&field.id) {
            Some(raw) if self.model.is_debouncing(&field.id) => (raw.clone(), raw.clone()),
            _ => {
                let display = field.format_value(&committed);
                (committed, display)
            }
        };
        let entry = self.errors.iter().find(|e| e.id == field.id);
        FieldDescriptor {
            id: field.id.clone(),
            input_id: format!("{}-{}", self.form_name, field.id),
            title: field.title.clone(),
            field_type: field.type_tag().to_string(),
            input: kind.input,
            value,
            display_value,
            error: resolve_error(self.model, entry),
            props: field.extra_props(self.args),
            scope: kind.has_reducer().then(|| self.scope.child(field.id.as_str())),
        }
    }

    /// Descriptors partitioned by group, schema order within a group.
    pub fn grouped(&self, visible: &[Arc<FieldSchema>]) -> BTreeMap<String, Vec<FieldDescriptor>> {
        let mut groups: BTreeMap<String, Vec<FieldDescriptor>> = BTreeMap::new();
        for field in visible {
            groups
                .entry(field.group_name().to_string())
                .or_default()
                .push(self.descriptor(field));
        }
        groups
    }
}

/// A raw event from an input control.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Text typed into a control.
    Text(String),
    /// Checked state of a checkbox.
    Checked(bool),
    /// A value supplied directly (pickers, composite controls).
    Value(Value),
}

impl InputEvent {
    /// The value the control reports, given its input kind.
    pub fn normalize(self, input: InputKind) -> Value {
        match (input, self) {
            (_, Self::Checked(checked)) => Value::Bool(checked),
            (InputKind::Checkbox, Self::Text(text)) => {
                Value::Bool(matches!(text.as_str(), "true" | "on"))
            }
            (_, Self::Text(text)) => Value::String(text),
            (_, Self::Value(value)) => value,
        }
    }
}

/// Runs `parse` and then the `on_change` interceptor over a raw value.
pub fn resolve_value(field: &FieldSchema, model: &FormModel, args: &Value, raw: Value) -> Value {
    let parsed = field.parse_value(raw);
    match &field.on_change {
        Some(on_change) => {
            let ctx = ChangeContext {
                value: parsed.clone(),
                args,
                fields: &model.fields,
            };
            on_change(&ctx).unwrap_or(parsed)
        }
        None => parsed,
    }
}

/// True when `value` differs from the committed value of `id`.
pub fn needs_commit(model: &FormModel, id: &str, value: &Value) -> bool {
    model.fields.get(id) != Some(value)
}
