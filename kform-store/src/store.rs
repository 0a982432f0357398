//! Single-threaded root store.
//!
//! Owns the state tree, the optional root reducer, the reducer registry and
//! the subscriber list. All mutation happens inside [`Store::dispatch`] on
//! one thread; subscribers are notified synchronously afterwards, in
//! registration order.

use crate::error::StoreResult;
use crate::registry::{self, ReducerRegistry};
use kform_types::{Action, ScopePath, SharedReducer};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

/// Identifier of a store subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Listener {
    id: SubscriptionId,
    active: Cell<bool>,
    callback: RefCell<Box<dyn FnMut()>>,
}

struct StoreInner {
    state: RefCell<Value>,
    registry: RefCell<ReducerRegistry>,
    root_reducer: Option<SharedReducer>,
    listeners: RefCell<Vec<Rc<Listener>>>,
    next_listener_id: Cell<u64>,
}

/// Handle to the root store. Cloning shares the same store.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Creates a store whose state starts as an empty object.
    pub fn new() -> Self {
        Self::build(None, Value::Object(Map::new()))
    }

    /// Creates a store whose whole tree is also handled by `root`.
    ///
    /// The root reducer receives every action unmodified, before scoped
    /// routing takes place.
    pub fn with_root_reducer(root: SharedReducer) -> Self {
        let initial = root.init();
        Self::build(Some(root), initial)
    }

    fn build(root_reducer: Option<SharedReducer>, state: Value) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(state),
                registry: RefCell::new(ReducerRegistry::new()),
                root_reducer,
                listeners: RefCell::new(Vec::new()),
                next_listener_id: Cell::new(0),
            }),
        }
    }

    // ── Reducer lifecycle ────────────────────────────────────────

    /// Registers `reducer` at `path`.
    pub fn assoc_reducer(&self, path: ScopePath, reducer: SharedReducer) -> StoreResult<()> {
        self.inner.registry.borrow_mut().register(path.clone(), reducer)?;
        info!(scope = %path, "Reducer attached");
        Ok(())
    }

    /// Removes the reducer at `path`. Returns whether one was registered.
    ///
    /// State already written at the path is kept; see [`Store::remove_state`].
    pub fn dissoc_reducer(&self, path: &ScopePath) -> bool {
        let removed = self.inner.registry.borrow_mut().unregister(path).is_some();
        if removed {
            info!(scope = %path, "Reducer detached");
        }
        removed
    }

    /// True if a reducer is registered at `path`.
    pub fn is_registered(&self, path: &ScopePath) -> bool {
        self.inner.registry.borrow().contains(path)
    }

    /// Number of registered scoped reducers.
    pub fn reducer_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Applies `action` to the state tree and notifies subscribers.
    ///
    /// Returns the number of scoped reducers that received the action.
    pub fn dispatch(&self, action: Action) -> usize {
        let delivered = {
            let mut state = self.inner.state.borrow_mut();
            if let Some(root) = &self.inner.root_reducer {
                let current = std::mem::take(&mut *state);
                *state = root.reduce(current, &action);
            }
            self.inner.registry.borrow().route(&mut *state, &action)
        };
        debug!(scope = %action.scope, kind = %action.kind, delivered, "Action dispatched");
        self.notify();
        delivered
    }

    /// Serializes a typed message into an envelope addressed at `scope` and
    /// dispatches it.
    pub fn dispatch_message<T: Serialize>(
        &self,
        scope: ScopePath,
        message: &T,
    ) -> StoreResult<usize> {
        let action = Action::from_message(scope, message)?;
        Ok(self.dispatch(action))
    }

    fn notify(&self) {
        let listeners: Vec<Rc<Listener>> = self.inner.listeners.borrow().clone();
        for listener in listeners {
            if !listener.active.get() {
                continue;
            }
            // A listener that dispatches from inside its callback is not
            // re-entered by the nested notification pass.
            if let Ok(mut callback) = listener.callback.try_borrow_mut() {
                let callback: &mut dyn FnMut() = &mut **callback;
                callback();
            }
        }
    }

    // ── State access ─────────────────────────────────────────────

    /// Returns a copy of the whole state tree.
    pub fn get_state(&self) -> Value {
        self.inner.state.borrow().clone()
    }

    /// Runs `f` with a borrow of the whole state tree.
    pub fn with_state<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Returns a copy of the state stored for `path`, if materialized.
    pub fn select(&self, path: &ScopePath) -> Option<Value> {
        let keys = self.inner.registry.borrow().slot_keys(path);
        let state = self.inner.state.borrow();
        registry::slot(&state, &keys).filter(|v| !v.is_null()).cloned()
    }

    /// Deletes the state stored for `path` and returns it.
    ///
    /// Removing the root path resets the tree to an empty object.
    pub fn remove_state(&self, path: &ScopePath) -> Option<Value> {
        let keys = self.inner.registry.borrow().slot_keys(path);
        let mut state = self.inner.state.borrow_mut();
        let Some((last, parents)) = keys.split_last() else {
            return Some(std::mem::replace(&mut *state, Value::Object(Map::new())));
        };
        let container = parents
            .iter()
            .try_fold(&mut *state, |current, key| current.as_object_mut()?.get_mut(key))?;
        let removed = container.as_object_mut()?.remove(last);
        if removed.is_some() {
            debug!(scope = %path, "State removed");
        }
        removed
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Registers a listener called after every dispatch.
    pub fn subscribe(&self, listener: impl FnMut() + 'static) -> Subscription {
        let id = SubscriptionId(self.inner.next_listener_id.get());
        self.inner.next_listener_id.set(id.0 + 1);
        self.inner.listeners.borrow_mut().push(Rc::new(Listener {
            id,
            active: Cell::new(true),
            callback: RefCell::new(Box::new(listener)),
        }));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Removes a listener. Returns whether it was still subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        unsubscribe_from(&self.inner, id)
    }

    /// Number of active listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("registry", &*self.inner.registry.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

fn unsubscribe_from(inner: &StoreInner, id: SubscriptionId) -> bool {
    let mut listeners = inner.listeners.borrow_mut();
    match listeners.iter().position(|l| l.id == id) {
        Some(index) => {
            let listener = listeners.remove(index);
            // Suppresses delivery in a notification pass already under way.
            listener.active.set(false);
            true
        }
        None => false,
    }
}

/// Handle returned by [`Store::subscribe`].
///
/// Dropping the handle keeps the listener subscribed; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug, Clone)]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: SubscriptionId,
}

impl Subscription {
    /// The subscription identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the listener. Returns whether it was still subscribed.
    pub fn unsubscribe(&self) -> bool {
        self.store
            .upgrade()
            .is_some_and(|inner| unsubscribe_from(&inner, self.id))
    }
}
