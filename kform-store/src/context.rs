//! Scope-aware context handed down to nested components.

use crate::error::StoreResult;
use crate::store::Store;
use kform_types::{Action, ScopePath, SharedReducer};
use serde::Serialize;
use serde_json::Value;

/// A store handle bound to one scope of the state tree.
///
/// Nested components derive their own scope with [`ScopeContext::child`],
/// appending one segment (a field id or a mount-position id).
#[derive(Debug, Clone)]
pub struct ScopeContext {
    store: Store,
    scope: ScopePath,
}

impl ScopeContext {
    /// Creates a context for `scope`.
    pub fn new(store: Store, scope: ScopePath) -> Self {
        Self { store, scope }
    }

    /// Context addressing the whole state tree.
    pub fn root(store: Store) -> Self {
        Self::new(store, ScopePath::root())
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The scope of this context.
    pub fn scope(&self) -> &ScopePath {
        &self.scope
    }

    /// Context for a nested scope one segment deeper.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        Self::new(self.store.clone(), self.scope.child(segment))
    }

    /// Dispatches an action addressed at this scope.
    pub fn dispatch(&self, kind: impl Into<String>, payload: Value) -> usize {
        self.store
            .dispatch(Action::scoped(self.scope.clone(), kind).with_payload(payload))
    }

    /// Dispatches a typed message addressed at this scope.
    pub fn dispatch_message<T: Serialize>(&self, message: &T) -> StoreResult<usize> {
        self.store.dispatch_message(self.scope.clone(), message)
    }

    /// State stored at this scope, if materialized.
    pub fn select(&self) -> Option<Value> {
        self.store.select(&self.scope)
    }

    /// Registers `reducer` as the owner of this scope.
    pub fn assoc_reducer(&self, reducer: SharedReducer) -> StoreResult<()> {
        self.store.assoc_reducer(self.scope.clone(), reducer)
    }

    /// Unregisters the owner of this scope.
    pub fn dissoc_reducer(&self) -> bool {
        self.store.dissoc_reducer(&self.scope)
    }
}
