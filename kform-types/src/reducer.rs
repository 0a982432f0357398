use crate::Action;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// A pure state transition owned by one scope of the state tree.
///
/// Reducers never see state outside their own slot, and the slots of
/// reducers registered below them are detached while they run. They must
/// not panic: an action they do not understand returns the state unchanged.
pub trait Reducer {
    /// The state produced for the `@@INIT` action, used when a slot is
    /// materialized for the first time.
    fn init(&self) -> Value;

    /// Applies a local action (scope already relative to this reducer).
    fn reduce(&self, state: Value, action: &Action) -> Value;

    /// Key inside this reducer's state under which the nested scope
    /// `segment` keeps its state. `None` means the nested scope is a plain
    /// object key of the state, hidden from this reducer while it runs.
    ///
    /// A reducer that names a child slot owns the nested state kept there
    /// and may replace it, for example to restore initial sub-states on
    /// reset.
    fn child_slot(&self, _segment: &str) -> Option<&str> {
        None
    }

    /// Whether actions addressed below this reducer's scope are delivered to
    /// it as well, with the remaining scope left on the action. Off by
    /// default: a reducer only sees actions addressed at its own scope.
    fn accepts_nested(&self) -> bool {
        false
    }
}

/// Shared handle to a reducer.
pub type SharedReducer = Rc<dyn Reducer>;

/// Reducer built from two closures.
pub struct FnReducer<I, R> {
    init: I,
    reduce: R,
}

impl<I, R> Reducer for FnReducer<I, R>
where
    I: Fn() -> Value,
    R: Fn(Value, &Action) -> Value,
{
    fn init(&self) -> Value {
        (self.init)()
    }

    fn reduce(&self, state: Value, action: &Action) -> Value {
        (self.reduce)(state, action)
    }
}

impl<I, R> fmt::Debug for FnReducer<I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReducer").finish_non_exhaustive()
    }
}

/// Shorthand for a closure-based reducer.
///
/// ```
/// use kform_types::{reducer_fn, Action, Reducer};
/// use serde_json::{json, Value};
///
/// let counter = reducer_fn(
///     || json!({"counter": 0}),
///     |state: Value, action: &Action| match action.kind.as_str() {
///         "INC" => json!({"counter": state["counter"].as_i64().unwrap_or(0) + 1}),
///         _ => state,
///     },
/// );
/// assert_eq!(counter.reduce(counter.init(), &Action::new("INC")), json!({"counter": 1}));
/// ```
pub fn reducer_fn<I, R>(init: I, reduce: R) -> FnReducer<I, R>
where
    I: Fn() -> Value,
    R: Fn(Value, &Action) -> Value,
{
    FnReducer { init, reduce }
}
