//! Form engine for kform.
//!
//! Everything a mounted form needs on top of the store:
//! - [`FormModel`]: per-form state kept in the state tree
//! - [`FormAction`] / [`FormUpdater`]: the form state machine
//! - [`validation`]: per-field and per-form validation, error visibility
//! - [`selectors`]: visible and grouped field derivation, input resolution
//! - [`schedule`]: cancellable debounce timers (manual and tokio-backed)
//! - [`FormInstance`]: mount/unmount, bound dispatchers, change and submit
//!   handling
//! - [`FormConfig`]: behavior switches, loadable from TOML
//!
//! # Example
//!
//! ```
//! use kform_engine::{FormInstance, ManualScheduler, SubmitOutcome};
//! use kform_model::{validators, FieldSchema, FieldTypeRegistry, FormSchema};
//! use kform_store::{ScopeContext, Store};
//! use kform_types::ScopePath;
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! let schema = FormSchema::new(vec![
//!     FieldSchema::new("name").title("Name").validate(validators::required()),
//! ])
//! .unwrap();
//! let store = Store::new();
//! let form = FormInstance::new(
//!     "signup",
//!     ScopeContext::new(store.clone(), ScopePath::from(["forms", "signup"])),
//!     Arc::new(schema),
//!     Rc::new(FieldTypeRegistry::with_builtins()),
//!     Rc::new(ManualScheduler::new()),
//! );
//! form.mount().unwrap();
//!
//! let outcome = form.handle_submit().unwrap();
//! assert!(matches!(outcome, SubmitOutcome::Blocked { .. }));
//! assert!(form.model().submit_dirty);
//! ```

mod action;
mod config;
mod error;
mod instance;
mod model;
pub mod schedule;
pub mod selectors;
mod updater;
pub mod validation;

pub use action::{DebounceMode, FormAction};
pub use config::FormConfig;
pub use error::{EngineError, EngineResult};
pub use instance::{FormHooks, FormInstance, InputControls, SubmitOutcome};
pub use model::{get_initial_model, FormModel, FormSnapshot, SubStates};
pub use schedule::{ManualScheduler, Scheduler, TaskId, TokioScheduler};
pub use selectors::{FieldDescriptor, FieldView, InputEvent, VisibleFieldsCache};
pub use updater::{FormUpdater, SUB_STATES_KEY};
pub use validation::{AsyncErrors, FieldError, GENERAL_ERROR_KEY};
