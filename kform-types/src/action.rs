//! The action envelope.
//!
//! Every state change is described by an [`Action`]: an explicit scope path,
//! a type tag and a JSON payload. Routing compares scopes structurally; the
//! type tag is only interpreted by the reducer that finally receives the
//! action.
//!
//! Typed messages (for example the form updater's actions) are serde enums
//! tagged as `{"type": ..., "payload": ...}` and convert to and from the
//! envelope with [`Action::from_message`] and [`Action::decode`].

use crate::{Error, Result, ScopePath};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A scoped action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Where the action is addressed, relative to the receiver.
    #[serde(default)]
    pub scope: ScopePath,
    /// Type tag, e.g. `"SET_FIELD"` or `"INC"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Action payload. `Null` when the action carries none.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Action {
    /// Type tag of the synthetic action used to materialize a reducer's
    /// initial state.
    pub const INIT: &'static str = "@@INIT";

    /// Creates an unscoped action without payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            scope: ScopePath::root(),
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// Creates an action addressed at `scope`.
    pub fn scoped(scope: ScopePath, kind: impl Into<String>) -> Self {
        Self {
            scope,
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// The `@@INIT` action.
    pub fn init() -> Self {
        Self::new(Self::INIT)
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Replaces the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: ScopePath) -> Self {
        self.scope = scope;
        self
    }

    /// True when the action is addressed at the receiver itself rather than
    /// at one of its descendants.
    pub fn is_local(&self) -> bool {
        self.scope.is_empty()
    }

    /// Rewrites the action for a receiver registered at `prefix`: the matched
    /// prefix is stripped from the scope, type and payload are kept.
    ///
    /// Returns `None` when the action is not addressed inside `prefix`.
    pub fn localize(&self, prefix: &ScopePath) -> Option<Action> {
        let scope = self.scope.strip_prefix(prefix)?;
        Some(Action {
            scope,
            kind: self.kind.clone(),
            payload: self.payload.clone(),
        })
    }

    /// Builds an envelope from a typed message that serializes as
    /// `{"type": ..., "payload": ...}`.
    pub fn from_message<T: Serialize>(scope: ScopePath, message: &T) -> Result<Self> {
        let mut map = match serde_json::to_value(message)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::MalformedAction(format!(
                    "message must serialize to an object, got {other}"
                )));
            }
        };
        let kind = match map.remove("type") {
            Some(Value::String(kind)) => kind,
            other => {
                return Err(Error::MalformedAction(format!(
                    "message is missing a string `type` tag (found {other:?})"
                )));
            }
        };
        let payload = map.remove("payload").unwrap_or(Value::Null);
        Ok(Self {
            scope,
            kind,
            payload,
        })
    }

    /// Decodes the type tag and payload into a typed message.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut map = serde_json::Map::new();
        map.insert("type".to_string(), Value::String(self.kind.clone()));
        if !self.payload.is_null() {
            map.insert("payload".to_string(), self.payload.clone());
        }
        Ok(serde_json::from_value(Value::Object(map))?)
    }
}
