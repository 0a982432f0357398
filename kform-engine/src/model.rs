//! Per-form state.
//!
//! A [`FormModel`] is what a form updater keeps in its slot of the state
//! tree. It serializes with camelCase keys (`submitDirty`, `defaultValues`,
//! `subStates`, ...) so hosts reading the tree see the familiar shape.

use kform_model::{FieldTypeRegistry, Fields, FormSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Sub-states of composite fields, keyed by field id.
pub type SubStates = BTreeMap<String, Value>;

/// State of one form instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormModel {
    /// Any field edited since the last submit or reset.
    pub dirty: bool,
    /// A submit attempt was blocked by validation.
    pub submit_dirty: bool,
    /// Committed values, one per schema field.
    pub fields: Fields,
    /// Values restored on reset.
    pub default_values: Fields,
    pub sub_states: SubStates,
    pub initial_sub_states: SubStates,
    /// Fields with an open debounce window.
    pub debouncing: BTreeSet<String>,
    /// Uncommitted input held while a field is debouncing.
    pub raw: Fields,
    /// Bumped whenever `fields` change; pending input in `raw` does not
    /// count.
    pub revision: u64,
}

/// The part of a [`FormModel`] handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub dirty: bool,
    pub submit_dirty: bool,
    pub fields: Fields,
    pub sub_states: SubStates,
}

/// Builds the model a form starts with.
///
/// Every schema field gets its default value (or `""`); every field whose
/// type registers a sub-reducer gets that reducer's initial state.
pub fn get_initial_model(schema: &FormSchema, types: &FieldTypeRegistry) -> FormModel {
    let fields: Fields = schema
        .iter()
        .map(|field| (field.id.clone(), field.initial_value()))
        .collect();
    let sub_states: SubStates = schema
        .iter()
        .filter_map(|field| {
            types
                .reducer_for(field)
                .map(|reducer| (field.id.clone(), reducer.init()))
        })
        .collect();
    FormModel {
        default_values: fields.clone(),
        fields,
        initial_sub_states: sub_states.clone(),
        sub_states,
        ..FormModel::default()
    }
}

impl FormModel {
    /// Decodes a model from its slot in the state tree.
    pub fn from_state(state: &Value) -> Option<Self> {
        serde_json::from_value(state.clone()).ok()
    }

    // ── Selectors ────────────────────────────────────────────────

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn default_values(&self) -> &Fields {
        &self.default_values
    }

    pub fn is_debouncing(&self, id: &str) -> bool {
        self.debouncing.contains(id)
    }

    /// The value an input should show: the raw value while debouncing,
    /// otherwise the committed one.
    pub fn input_value(&self, id: &str) -> Option<&Value> {
        if self.is_debouncing(id) {
            if let Some(raw) = self.raw.get(id) {
                return Some(raw);
            }
        }
        self.fields.get(id)
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            dirty: self.dirty,
            submit_dirty: self.submit_dirty,
            fields: self.fields.clone(),
            sub_states: self.sub_states.clone(),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────

    /// Merges `values` into the committed fields. Ids the form does not
    /// have are skipped.
    #[must_use]
    pub fn set_fields(mut self, values: &Fields) -> Self {
        for (id, value) in values {
            if let Some(slot) = self.fields.get_mut(id) {
                *slot = value.clone();
            }
        }
        self.revision += 1;
        self
    }

    /// Like [`set_fields`](Self::set_fields), also making the values the
    /// new reset target.
    #[must_use]
    pub fn set_fields_and_defaults(self, values: &Fields) -> Self {
        let mut model = self.set_fields(values);
        for (id, value) in values {
            if let Some(slot) = model.default_values.get_mut(id) {
                *slot = value.clone();
            }
        }
        model
    }

    /// Replaces the sub-states of the given composite fields.
    #[must_use]
    pub fn set_sub_states(mut self, sub_states: SubStates) -> Self {
        self.sub_states.extend(sub_states);
        self
    }

    /// Restores defaults and initial sub-states, drops pending debounce
    /// input and clears both dirty flags.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.fields = self.default_values.clone();
        self.sub_states = self.initial_sub_states.clone();
        self.debouncing.clear();
        self.raw.clear();
        self.revision += 1;
        self.clear_flags()
    }

    #[must_use]
    pub(crate) fn clear_flags(mut self) -> Self {
        self.dirty = false;
        self.submit_dirty = false;
        self
    }
}
