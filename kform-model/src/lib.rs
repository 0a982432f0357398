//! Form schema model for kform.
//!
//! Defines the caller-supplied, immutable description of a form:
//! - [`FieldSchema`]: one field (id, title, type tag, default value,
//!   validators, parse/format, change interceptor, props, visibility,
//!   debounce window, group)
//! - [`FormSchema`]: ordered fields indexed by id
//! - [`FieldTypeRegistry`]: type tag → [`FieldKind`] capability bundle
//! - [`validators`]: built-in validators (`required`, `min_length`, ...)
//!
//! The engine never owns or mutates a schema.

mod field_type;
mod schema;
pub mod validators;

pub use field_type::{FieldKind, FieldTypeRegistry, InputKind};
pub use schema::{
    ChangeContext, ChangeInterceptor, FieldSchema, Fields, FormSchema, Formatter, Parser,
    PropsFn, Validator, VisibleFn, DEFAULT_FIELD_TYPE, DEFAULT_GROUP,
};

/// A field declares a type tag with no registered [`FieldKind`].
///
/// Non-fatal: the field is treated as plain text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field_id}' declares unregistered type '{field_type}'")]
pub struct SchemaMismatch {
    pub field_id: String,
    pub field_type: String,
}

/// Errors that prevent a schema from being built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate field id: {0}")]
    DuplicateField(String),
}
