//! Form instance host.
//!
//! A [`FormInstance`] is what a view component holds for one mounted form:
//! it registers the form's updater (and the reducers of its composite
//! fields) on mount, exposes bound dispatchers, turns input events into
//! actions (owning the debounce timers), runs validation before submit and
//! delegates focus to the host's [`InputControls`].

use crate::action::{DebounceMode, FormAction};
use crate::config::FormConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{get_initial_model, FormModel, FormSnapshot};
use crate::schedule::{Scheduler, TaskId};
use crate::selectors::{
    needs_commit, resolve_value, FieldDescriptor, FieldView, InputEvent, VisibleFieldsCache,
};
use crate::updater::FormUpdater;
use crate::validation::{blocks_submit, first_blocking, validate_form, AsyncErrors, FieldError};
use kform_model::{FieldSchema, FieldTypeRegistry, Fields, FormSchema};
use kform_store::ScopeContext;
use kform_types::{Action, ScopePath};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Access to the host's input controls.
pub trait InputControls {
    /// Moves input focus to the control of `field_id`.
    fn focus(&self, field_id: &str);

    /// Value read from the control itself at submit time (file inputs).
    /// `None` uses the committed value.
    fn submitted_value(&self, _field_id: &str) -> Option<Value> {
        None
    }
}

/// Interception points around submit and cancel.
pub trait FormHooks {
    /// Called with the values about to be submitted. Returning false stops
    /// the `SUBMIT` dispatch.
    fn on_submit(&self, _values: &Fields) -> bool {
        true
    }

    /// Called before the form is cancelled. Returning false keeps it as is.
    fn on_cancel(&self) -> bool {
        true
    }
}

/// Result of [`FormInstance::handle_submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// `SUBMIT` was dispatched with these values.
    Submitted(Fields),
    /// Validation failed; `SET_SUBMIT_DIRTY` was dispatched instead.
    Blocked {
        errors: Vec<FieldError>,
        focused: Option<String>,
    },
    /// A [`FormHooks::on_submit`] hook declined.
    Intercepted,
}

/// One mounted form.
pub struct FormInstance {
    name: String,
    ctx: ScopeContext,
    schema: Arc<FormSchema>,
    types: Rc<FieldTypeRegistry>,
    config: FormConfig,
    scheduler: Rc<dyn Scheduler>,
    controls: Option<Rc<dyn InputControls>>,
    hooks: Option<Rc<dyn FormHooks>>,
    args: Value,
    initial: FormModel,
    mounted: Cell<bool>,
    composites: RefCell<Vec<ScopePath>>,
    timers: Rc<RefCell<HashMap<String, TaskId>>>,
    async_errors: RefCell<AsyncErrors>,
    visible: RefCell<VisibleFieldsCache>,
}

impl FormInstance {
    /// Creates an unmounted instance that will live at `ctx.scope()`.
    pub fn new(
        name: impl Into<String>,
        ctx: ScopeContext,
        schema: Arc<FormSchema>,
        types: Rc<FieldTypeRegistry>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        let initial = get_initial_model(&schema, &types);
        Self {
            name: name.into(),
            ctx,
            schema,
            types,
            config: FormConfig::default(),
            scheduler,
            controls: None,
            hooks: None,
            args: Value::Null,
            initial,
            mounted: Cell::new(false),
            composites: RefCell::new(Vec::new()),
            timers: Rc::new(RefCell::new(HashMap::new())),
            async_errors: RefCell::new(AsyncErrors::new()),
            visible: RefCell::new(VisibleFieldsCache::new()),
        }
    }

    /// Builds the schema from `fields` and creates the instance.
    pub fn from_fields(
        name: impl Into<String>,
        ctx: ScopeContext,
        fields: Vec<FieldSchema>,
        types: Rc<FieldTypeRegistry>,
        scheduler: Rc<dyn Scheduler>,
    ) -> EngineResult<Self> {
        let schema = FormSchema::new(fields)?;
        Ok(Self::new(name, ctx, Arc::new(schema), types, scheduler))
    }

    #[must_use]
    pub fn with_config(mut self, config: FormConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_controls(mut self, controls: Rc<dyn InputControls>) -> Self {
        self.controls = Some(controls);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: Rc<dyn FormHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// External arguments passed to `props` and `on_change`.
    #[must_use]
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &ScopePath {
        self.ctx.scope()
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Context for a field's nested scope, for forms mounted inside a
    /// composite field.
    pub fn child_context(&self, field_id: &str) -> ScopeContext {
        self.ctx.child(field_id)
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Registers the form updater at the instance scope and one reducer per
    /// composite field one level deeper, then materializes the state.
    pub fn mount(&self) -> EngineResult<FormSnapshot> {
        let updater = FormUpdater::new(Arc::clone(&self.schema), Rc::clone(&self.types));
        self.ctx.assoc_reducer(Rc::new(updater))?;

        for field in self.schema.iter() {
            let Some(reducer) = self.types.reducer_for(field) else {
                continue;
            };
            let child = self.ctx.child(field.id.as_str());
            if let Err(e) = child.assoc_reducer(reducer) {
                self.release();
                return Err(e.into());
            }
            self.composites.borrow_mut().push(child.scope().clone());
        }

        self.mounted.set(true);
        self.visible.borrow_mut().invalidate();
        self.ctx.dispatch(Action::INIT, Value::Null);
        info!(form = %self.name, scope = %self.scope(), "Form mounted");

        if self.config.focus_first_on_mount {
            let model = self.model();
            let first = self.visible_ids(&model).into_iter().next();
            if let Some(id) = first {
                self.focus(&id);
            }
        }
        Ok(self.model().snapshot())
    }

    /// Unregisters every reducer of this instance and deletes its state.
    ///
    /// Pending debounce timers are left alone; their commits find no reducer
    /// and are dropped.
    pub fn unmount(&self) {
        if !self.mounted.replace(false) {
            debug!(form = %self.name, "Unmount of a form that is not mounted ignored");
            return;
        }
        self.release();
        self.ctx.store().remove_state(self.ctx.scope());
        info!(form = %self.name, scope = %self.scope(), "Form unmounted");
    }

    fn release(&self) {
        for path in self.composites.borrow_mut().drain(..) {
            self.ctx.store().dissoc_reducer(&path);
        }
        self.ctx.dissoc_reducer();
    }

    // ── State ────────────────────────────────────────────────────

    /// Current model, or the initial one when no state is stored yet.
    pub fn model(&self) -> FormModel {
        self.ctx
            .select()
            .and_then(|state| FormModel::from_state(&state))
            .unwrap_or_else(|| self.initial.clone())
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.model().snapshot()
    }

    // ── Bound dispatchers ────────────────────────────────────────

    fn dispatch(&self, action: &FormAction) -> EngineResult<()> {
        if !self.is_mounted() {
            return Err(EngineError::NotMounted(self.name.clone()));
        }
        self.ctx.dispatch_message(action)?;
        Ok(())
    }

    pub fn set_field(
        &self,
        id: &str,
        value: Value,
        debounce: Option<DebounceMode>,
    ) -> EngineResult<()> {
        self.dispatch(&FormAction::SetField {
            id: id.to_string(),
            value,
            debounce,
        })
    }

    pub fn submit(&self, reset_on_submit: bool, fields: Option<Fields>) -> EngineResult<()> {
        self.dispatch(&FormAction::Submit {
            reset_on_submit,
            fields,
        })
    }

    pub fn reset(&self, reset_on_cancel: bool) -> EngineResult<()> {
        self.dispatch(&FormAction::Reset { reset_on_cancel })
    }

    pub fn set_submit_dirty(&self) -> EngineResult<()> {
        self.dispatch(&FormAction::SetSubmitDirty)
    }

    pub fn load_values(&self, values: Fields) -> EngineResult<()> {
        self.dispatch(&FormAction::LoadValues { values })
    }

    /// Sends `action` to the reducer of composite field `field_id`, through
    /// the form updater. `set_field` also updates the field's own value.
    pub fn dispatch_sub_state(
        &self,
        field_id: &str,
        action: Action,
        set_field: Option<Value>,
    ) -> EngineResult<()> {
        let Some(field) = self.schema.get(field_id) else {
            warn!(form = %self.name, field_id, "Sub-state action for unknown field ignored");
            return Ok(());
        };
        self.dispatch(&FormAction::SetSubState {
            field_type: field.type_tag().to_string(),
            field_id: field_id.to_string(),
            action,
            set_field,
        })
    }

    // ── Input handling ───────────────────────────────────────────

    /// Applies an input event to field `id`.
    ///
    /// The event is parsed and run through `on_change` first; nothing is
    /// dispatched when the resulting value equals the committed one, and an
    /// open debounce window for the field is closed. Debounced fields
    /// dispatch the raw value immediately and commit the resolved value once
    /// the window closes; each new event restarts the window. Other fields
    /// commit at once.
    pub fn handle_change(&self, id: &str, event: InputEvent) -> EngineResult<()> {
        let Some(field) = self.schema.get(id).cloned() else {
            warn!(form = %self.name, field_id = id, "Change for unknown field ignored");
            return Ok(());
        };
        let raw = event.normalize(self.types.resolve(&field).input);
        let model = self.model();
        let value = resolve_value(&field, &model, &self.args, raw.clone());

        if !needs_commit(&model, id, &value) {
            self.cancel_timer(id);
            if model.is_debouncing(id) {
                debug!(form = %self.name, field_id = id, "Change reverts to committed value");
                self.set_field(id, Value::Null, Some(DebounceMode::Cancel))?;
            }
            return Ok(());
        }

        match field.debounce {
            Some(delay) => {
                self.set_field(id, raw, Some(DebounceMode::Start))?;
                self.schedule_commit(id, value, delay);
            }
            None => self.set_field(id, value, None)?,
        }
        Ok(())
    }

    fn schedule_commit(&self, id: &str, value: Value, delay: std::time::Duration) {
        self.cancel_timer(id);
        let ctx = self.ctx.clone();
        let timers = Rc::clone(&self.timers);
        let field_id = id.to_string();
        let task = self.scheduler.schedule(
            delay,
            Box::new(move || {
                timers.borrow_mut().remove(&field_id);
                let commit = FormAction::debounced(field_id.as_str(), value, DebounceMode::End);
                if let Err(e) = ctx.dispatch_message(&commit) {
                    warn!(field_id = %field_id, error = %e, "Debounced commit failed");
                }
            }),
        );
        self.timers.borrow_mut().insert(id.to_string(), task);
    }

    fn cancel_timer(&self, id: &str) -> bool {
        let previous = self.timers.borrow_mut().remove(id);
        previous.is_some_and(|task| self.scheduler.cancel(task))
    }

    /// Field ids with a pending debounce commit.
    pub fn pending_commits(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.timers.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }

    // ── Submit / cancel ──────────────────────────────────────────

    /// Validates and submits.
    ///
    /// With validator errors the submit is blocked: `SET_SUBMIT_DIRTY` is
    /// dispatched so errors become visible, and the first invalid field is
    /// focused. Otherwise the submitted values go through the submit hook and
    /// `SUBMIT` is dispatched.
    pub fn handle_submit(&self) -> EngineResult<SubmitOutcome> {
        let model = self.model();
        let errors = validate_form(&self.schema, &model, &self.async_errors.borrow());

        if blocks_submit(&errors) {
            self.set_submit_dirty()?;
            let focused = first_blocking(&errors).map(|entry| entry.id.clone());
            if let Some(id) = focused.as_deref().filter(|_| self.config.focus_on_blocked_submit) {
                self.focus(id);
            }
            info!(form = %self.name, errors = errors.len(), "Submit blocked by validation");
            return Ok(SubmitOutcome::Blocked { errors, focused });
        }

        let values = self.submit_values(&model);
        if let Some(hooks) = &self.hooks {
            if !hooks.on_submit(&values) {
                debug!(form = %self.name, "Submit intercepted by hook");
                return Ok(SubmitOutcome::Intercepted);
            }
        }
        if self.config.reset_on_submit {
            self.cancel_all_timers();
        }
        self.submit(self.config.reset_on_submit, Some(values.clone()))?;
        info!(form = %self.name, "Form submitted");
        Ok(SubmitOutcome::Submitted(values))
    }

    /// Cancels the form. Returns false when a hook declined.
    pub fn handle_cancel(&self) -> EngineResult<bool> {
        if let Some(hooks) = &self.hooks {
            if !hooks.on_cancel() {
                return Ok(false);
            }
        }
        if self.config.reset_on_cancel {
            self.cancel_all_timers();
        }
        self.reset(self.config.reset_on_cancel)?;
        Ok(true)
    }

    /// One value per schema field: the control-supplied value when there is
    /// one, else the committed value, else `null`.
    fn submit_values(&self, model: &FormModel) -> Fields {
        self.schema
            .iter()
            .map(|field| {
                let value = self
                    .controls
                    .as_ref()
                    .and_then(|controls| controls.submitted_value(&field.id))
                    .or_else(|| model.fields.get(&field.id).cloned())
                    .unwrap_or(Value::Null);
                (field.id.clone(), value)
            })
            .collect()
    }

    fn cancel_all_timers(&self) {
        let pending: Vec<TaskId> = self.timers.borrow_mut().drain().map(|(_, task)| task).collect();
        for task in pending {
            self.scheduler.cancel(task);
        }
    }

    // ── Errors ───────────────────────────────────────────────────

    /// Replaces the async errors and focuses the first visible field that
    /// has one.
    pub fn set_async_errors(&self, errors: AsyncErrors) {
        *self.async_errors.borrow_mut() = errors;
        if !self.config.focus_on_async_error {
            return;
        }
        let model = self.model();
        let first = {
            let errors = self.async_errors.borrow();
            self.visible_ids(&model)
                .into_iter()
                .find(|id| errors.get(id).is_some())
        };
        if let Some(id) = first {
            self.focus(&id);
        }
    }

    pub fn async_errors(&self) -> AsyncErrors {
        self.async_errors.borrow().clone()
    }

    /// Form-level async error.
    pub fn generic_error(&self) -> Option<String> {
        self.async_errors.borrow().general().map(str::to_string)
    }

    /// Current validation result.
    pub fn errors(&self) -> Vec<FieldError> {
        validate_form(&self.schema, &self.model(), &self.async_errors.borrow())
    }

    // ── Derived view data ────────────────────────────────────────

    /// Visible fields grouped for rendering.
    pub fn grouped_fields(&self) -> BTreeMap<String, Vec<FieldDescriptor>> {
        let model = self.model();
        let errors = self.errors();
        let mut cache = self.visible.borrow_mut();
        let visible = cache.get(&self.schema, &model);
        FieldView {
            form_name: &self.name,
            scope: self.ctx.scope(),
            model: &model,
            types: &self.types,
            errors: &errors,
            args: &self.args,
        }
        .grouped(visible)
    }

    /// How many times the visible field set was computed.
    pub fn visible_computations(&self) -> u64 {
        self.visible.borrow().computations()
    }

    fn visible_ids(&self, model: &FormModel) -> Vec<String> {
        self.visible
            .borrow_mut()
            .get(&self.schema, model)
            .iter()
            .map(|field| field.id.clone())
            .collect()
    }

    fn focus(&self, field_id: &str) {
        if let Some(controls) = &self.controls {
            debug!(form = %self.name, field_id, "Focusing field");
            controls.focus(field_id);
        }
    }
}

impl fmt::Debug for FormInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormInstance")
            .field("name", &self.name)
            .field("scope", self.ctx.scope())
            .field("mounted", &self.mounted.get())
            .field("fields", &self.schema.len())
            .finish_non_exhaustive()
    }
}
