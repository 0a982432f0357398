//! Form updater actions.
//!
//! Serialized as `{"type": "SET_FIELD", "payload": {...}}` and carried in an
//! [`Action`] envelope addressed at the form's scope.

use kform_model::Fields;
use kform_types::Action;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Phase of a debounced `SET_FIELD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebounceMode {
    /// Holds the raw value; the field stays uncommitted.
    Start,
    /// Commits the value and closes the window.
    End,
    /// Closes the window and drops the raw value. The committed value and
    /// the dirty flag are left alone.
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormAction {
    SetField {
        id: String,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        debounce: Option<DebounceMode>,
    },
    #[serde(rename_all = "camelCase")]
    Submit {
        reset_on_submit: bool,
        /// Values handed to the submit hook. Informational only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Fields>,
    },
    #[serde(rename_all = "camelCase")]
    Reset { reset_on_cancel: bool },
    SetSubmitDirty,
    /// Forwards `action` to the reducer of a composite field.
    #[serde(rename_all = "camelCase")]
    SetSubState {
        field_type: String,
        field_id: String,
        action: Action,
        /// Also writes this value into the parent field.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        set_field: Option<Value>,
    },
    /// Loads an existing record: values become both current and default.
    LoadValues { values: Fields },
}

impl FormAction {
    pub fn set_field(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::SetField {
            id: id.into(),
            value: value.into(),
            debounce: None,
        }
    }

    pub fn debounced(id: impl Into<String>, value: impl Into<Value>, mode: DebounceMode) -> Self {
        Self::SetField {
            id: id.into(),
            value: value.into(),
            debounce: Some(mode),
        }
    }

    /// Type tag as it appears in the envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetField { .. } => "SET_FIELD",
            Self::Submit { .. } => "SUBMIT",
            Self::Reset { .. } => "RESET",
            Self::SetSubmitDirty => "SET_SUBMIT_DIRTY",
            Self::SetSubState { .. } => "SET_SUB_STATE",
            Self::LoadValues { .. } => "LOAD_VALUES",
        }
    }
}
