//! The per-form reducer.

use crate::action::{DebounceMode, FormAction};
use crate::model::{get_initial_model, FormModel};
use kform_model::{FieldTypeRegistry, FormSchema};
use kform_types::{Action, Reducer};
use serde_json::Value;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Key under which composite fields keep their state.
pub const SUB_STATES_KEY: &str = "subStates";

/// State machine for one form instance.
///
/// Registered at the form's scope. Only actions addressed at the form itself
/// are handled; actions addressed deeper belong to composite fields and
/// nested forms, which the registry routes to their own reducers.
pub struct FormUpdater {
    schema: Arc<FormSchema>,
    types: Rc<FieldTypeRegistry>,
    initial: FormModel,
}

impl FormUpdater {
    /// Builds the updater and reports unregistered field types.
    pub fn new(schema: Arc<FormSchema>, types: Rc<FieldTypeRegistry>) -> Self {
        types.check(&schema);
        let initial = get_initial_model(&schema, &types);
        Self {
            schema,
            types,
            initial,
        }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn initial_model(&self) -> &FormModel {
        &self.initial
    }

    /// Applies one typed action.
    pub fn update(&self, mut model: FormModel, action: &FormAction) -> FormModel {
        match action {
            FormAction::SetField {
                id,
                value,
                debounce,
            } => {
                if !model.fields.contains_key(id) {
                    warn!(field_id = %id, "SET_FIELD for unknown field ignored");
                    return model;
                }
                match debounce {
                    Some(DebounceMode::Start) => {
                        model.raw.insert(id.clone(), value.clone());
                        model.debouncing.insert(id.clone());
                    }
                    Some(DebounceMode::Cancel) => {
                        model.raw.remove(id);
                        model.debouncing.remove(id);
                    }
                    Some(DebounceMode::End) => {
                        model.fields.insert(id.clone(), value.clone());
                        model.debouncing.remove(id);
                        model.raw.remove(id);
                        model.dirty = true;
                        model.revision += 1;
                    }
                    None => {
                        model.fields.insert(id.clone(), value.clone());
                        model.dirty = true;
                        model.revision += 1;
                    }
                }
                model
            }
            FormAction::Submit {
                reset_on_submit, ..
            } => {
                if *reset_on_submit {
                    model.reset()
                } else {
                    model.clear_flags()
                }
            }
            FormAction::Reset { reset_on_cancel } => {
                if *reset_on_cancel {
                    model.reset()
                } else {
                    model.clear_flags()
                }
            }
            FormAction::SetSubmitDirty => {
                model.submit_dirty = true;
                model
            }
            FormAction::SetSubState {
                field_type,
                field_id,
                action,
                set_field,
            } => self.update_sub_state(model, field_type, field_id, action, set_field.as_ref()),
            FormAction::LoadValues { values } => model.set_fields_and_defaults(values),
        }
    }

    fn update_sub_state(
        &self,
        mut model: FormModel,
        field_type: &str,
        field_id: &str,
        action: &Action,
        set_field: Option<&Value>,
    ) -> FormModel {
        let Some(reducer) = self.types.get(field_type).and_then(|kind| kind.reducer.clone()) else {
            warn!(field_type, field_id, "SET_SUB_STATE for a type without reducer ignored");
            return model;
        };
        let current = model
            .sub_states
            .remove(field_id)
            .filter(|state| !state.is_null())
            .unwrap_or_else(|| reducer.init());
        model
            .sub_states
            .insert(field_id.to_string(), reducer.reduce(current, action));

        if let Some(value) = set_field {
            if model.fields.contains_key(field_id) {
                model.fields.insert(field_id.to_string(), value.clone());
                model.dirty = true;
                model.revision += 1;
            }
        }
        model
    }

    fn encode(&self, model: &FormModel) -> Value {
        serde_json::to_value(model).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode form model");
            Value::Null
        })
    }
}

impl Reducer for FormUpdater {
    fn init(&self) -> Value {
        self.encode(&self.initial)
    }

    fn reduce(&self, state: Value, action: &Action) -> Value {
        if !action.is_local() {
            return state;
        }
        let Ok(message) = action.decode::<FormAction>() else {
            debug!(kind = %action.kind, "Action not handled by form updater");
            return state;
        };
        let model = match serde_json::from_value::<FormModel>(state) {
            Ok(model) => model,
            Err(e) => {
                warn!(error = %e, "Form state could not be decoded, starting over");
                self.initial.clone()
            }
        };
        let next = self.update(model, &message);
        self.encode(&next)
    }

    /// Composite fields keep their state in `subStates`; anything else
    /// mounted below the form is a plain key the updater never sees.
    fn child_slot(&self, segment: &str) -> Option<&str> {
        let composite = self
            .schema
            .get(segment)
            .is_some_and(|field| self.types.reducer_for(field).is_some());
        composite.then_some(SUB_STATES_KEY)
    }
}
