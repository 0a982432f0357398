//! Built-in validators.

use crate::schema::{FieldSchema, Fields, Validator};
use serde_json::Value;
use std::sync::Arc;

/// Wraps a closure as a [`Validator`].
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&Value, &Fields, &FieldSchema, bool) -> Option<String> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// True for `null`, blank strings and empty arrays.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Rejects blank values with a generic message.
pub fn required() -> Validator {
    required_with("This field is required")
}

/// Rejects blank values with `message`.
pub fn required_with(message: impl Into<String>) -> Validator {
    let message = message.into();
    validator(move |value, _, _, _| is_blank(value).then(|| message.clone()))
}

/// Rejects strings shorter than `min` characters. Blank values pass; combine
/// with [`required`] to reject them.
pub fn min_length(min: usize) -> Validator {
    validator(move |value, _, _, _| {
        let text = value.as_str()?;
        (!text.is_empty() && text.chars().count() < min)
            .then(|| format!("Must be at least {min} characters"))
    })
}

/// Rejects strings longer than `max` characters.
pub fn max_length(max: usize) -> Validator {
    validator(move |value, _, _, _| {
        let text = value.as_str()?;
        (text.chars().count() > max).then(|| format!("Must be at most {max} characters"))
    })
}

/// Suppresses `inner` while the field is mid-debounce.
pub fn skip_while_debouncing(inner: Validator) -> Validator {
    validator(move |value, fields, schema, debouncing| {
        if debouncing {
            None
        } else {
            inner(value, fields, schema, debouncing)
        }
    })
}
