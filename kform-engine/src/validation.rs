//! Validation and error visibility.
//!
//! Validation results are data. [`validate_form`] lists every visible field
//! with a validator error or an externally supplied async error;
//! [`resolve_error`] decides what a field actually shows.

use crate::model::FormModel;
use kform_model::{FieldSchema, FormSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key of the form-level async error.
pub const GENERAL_ERROR_KEY: &str = "__general";

/// Errors reported by an external source (usually a server), keyed by field
/// id. The form-level error lives under [`GENERAL_ERROR_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncErrors(BTreeMap<String, String>);

impl AsyncErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error for `id`; blank messages count as none.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str).filter(|m| !m.is_empty())
    }

    pub fn insert(&mut self, id: impl Into<String>, message: impl Into<String>) {
        self.0.insert(id.into(), message.into());
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.0.remove(id)
    }

    pub fn general(&self) -> Option<&str> {
        self.get(GENERAL_ERROR_KEY)
    }

    pub fn set_general(&mut self, message: impl Into<String>) {
        self.insert(GENERAL_ERROR_KEY, message);
    }

    pub fn clear_general(&mut self) {
        self.0.remove(GENERAL_ERROR_KEY);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(String::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AsyncErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Validation result for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_error: Option<String>,
}

impl FieldError {
    /// Validator errors block submission; async errors do not.
    pub fn is_blocking(&self) -> bool {
        self.error.is_some()
    }
}

/// Runs the validators of `field` in order and returns the first message.
pub fn validate_field(field: &FieldSchema, model: &FormModel) -> Option<String> {
    let value = model.fields.get(&field.id).unwrap_or(&Value::Null);
    let debouncing = model.is_debouncing(&field.id);
    field
        .validate
        .iter()
        .filter_map(|validator| validator(value, &model.fields, field, debouncing))
        .find(|message| !message.is_empty())
}

/// Validates every visible field, keeping those with any error.
///
/// Entries are in schema order.
pub fn validate_form(
    schema: &FormSchema,
    model: &FormModel,
    async_errors: &AsyncErrors,
) -> Vec<FieldError> {
    schema
        .iter()
        .filter(|field| field.is_visible(&model.fields))
        .filter_map(|field| {
            let error = validate_field(field, model);
            let async_error = async_errors.get(&field.id).map(str::to_string);
            (error.is_some() || async_error.is_some()).then(|| FieldError {
                id: field.id.clone(),
                error,
                async_error,
            })
        })
        .collect()
}

/// The message a field should display, if any.
///
/// An async error shows while the form is untouched. Once the user edits
/// (or a submit fails) the validator error takes over, and only shows after
/// a failed submit or when the field also has an async error.
pub fn resolve_error(model: &FormModel, entry: Option<&FieldError>) -> Option<String> {
    let entry = entry?;
    match &entry.async_error {
        Some(async_error) if !model.dirty && !model.submit_dirty => Some(async_error.clone()),
        async_error => {
            let visible = model.submit_dirty || (async_error.is_some() && model.dirty);
            if visible { entry.error.clone() } else { None }
        }
    }
}

/// True when any entry carries a validator error.
pub fn blocks_submit(errors: &[FieldError]) -> bool {
    errors.iter().any(FieldError::is_blocking)
}

/// First entry with a validator error, in schema order.
pub fn first_blocking(errors: &[FieldError]) -> Option<&FieldError> {
    errors.iter().find(|entry| entry.is_blocking())
}
