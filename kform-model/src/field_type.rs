//! Field type registry.
//!
//! A field's `type` tag selects a capability bundle: how raw input events are
//! read (`InputKind`) and, for composite fields, the reducer that owns the
//! field's private sub-state. Every tag referenced by a schema is checked
//! when the schema is loaded; unknown tags are reported as
//! [`SchemaMismatch`] and degrade to plain text.

use crate::schema::{FieldSchema, FormSchema, DEFAULT_FIELD_TYPE};
use crate::SchemaMismatch;
use kform_types::SharedReducer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// How a control reports its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Reports its text.
    #[default]
    Text,
    /// Reports its checked state.
    Checkbox,
    /// Reports selected files; the control supplies the submitted value.
    File,
    /// Owns a sub-state through its own reducer.
    Composite,
}

/// Capability bundle registered for a type tag.
#[derive(Clone, Default)]
pub struct FieldKind {
    pub input: InputKind,
    pub reducer: Option<SharedReducer>,
}

impl FieldKind {
    pub fn text() -> Self {
        Self::default()
    }

    pub fn checkbox() -> Self {
        Self {
            input: InputKind::Checkbox,
            reducer: None,
        }
    }

    pub fn file() -> Self {
        Self {
            input: InputKind::File,
            reducer: None,
        }
    }

    /// A composite field whose sub-state is owned by `reducer`.
    pub fn composite(reducer: SharedReducer) -> Self {
        Self {
            input: InputKind::Composite,
            reducer: Some(reducer),
        }
    }

    pub fn has_reducer(&self) -> bool {
        self.reducer.is_some()
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldKind")
            .field("input", &self.input)
            .field("has_reducer", &self.reducer.is_some())
            .finish()
    }
}

/// Maps type tags to capability bundles.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeRegistry {
    kinds: HashMap<String, FieldKind>,
}

impl FieldTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `text`, `checkbox` and `file` types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_FIELD_TYPE, FieldKind::text());
        registry.register("checkbox", FieldKind::checkbox());
        registry.register("file", FieldKind::file());
        registry
    }

    /// Registers `kind` under `tag`, returning the bundle it replaced.
    pub fn register(&mut self, tag: impl Into<String>, kind: FieldKind) -> Option<FieldKind> {
        self.kinds.insert(tag.into(), kind)
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, kind: FieldKind) -> Self {
        self.register(tag, kind);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&FieldKind> {
        self.kinds.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.kinds.contains_key(tag)
    }

    /// The bundle for `field`, falling back to plain text for unknown tags.
    pub fn resolve(&self, field: &FieldSchema) -> FieldKind {
        self.get(field.type_tag()).cloned().unwrap_or_default()
    }

    /// The sub-reducer for `field`, if its type declares one.
    pub fn reducer_for(&self, field: &FieldSchema) -> Option<SharedReducer> {
        self.get(field.type_tag()).and_then(|kind| kind.reducer.clone())
    }

    /// Reports every field whose type tag is not registered.
    ///
    /// Mismatches are logged; they never stop the schema from loading.
    pub fn check(&self, schema: &FormSchema) -> Vec<SchemaMismatch> {
        let mismatches: Vec<SchemaMismatch> = schema
            .iter()
            .filter(|field| !self.contains(field.type_tag()))
            .map(|field| SchemaMismatch {
                field_id: field.id.clone(),
                field_type: field.type_tag().to_string(),
            })
            .collect();
        for mismatch in &mismatches {
            warn!(
                field_id = %mismatch.field_id,
                field_type = %mismatch.field_type,
                "Missing type registration, falling back to text"
            );
        }
        mismatches
    }
}
