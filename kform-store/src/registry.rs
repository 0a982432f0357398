//! Scoped reducer registry.
//!
//! Maps scope paths to reducers and routes actions to every reducer whose
//! path is a prefix of the action scope. Each registered path is tried
//! independently: sibling instances that differ only in one segment each
//! receive exactly the actions addressed inside their own scope. Reducers
//! above the addressed scope are skipped unless they opt into nested
//! actions, so a parent never reacts to its children's actions.
//!
//! State slots are resolved structurally. A path segment nested under a
//! registered reducer that declares a
//! [`child_slot`](Reducer::child_slot) lives inside that slot,
//! so a composite field registered at `[form, job]` keeps its state at
//! `form.subStates.job` when the form reducer declares `subStates`.

use crate::error::{StoreError, StoreResult};
use kform_types::{Action, Reducer, ScopePath, SharedReducer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Registry of scoped reducers.
#[derive(Default)]
pub struct ReducerRegistry {
    /// Ordered so that parents are visited before their descendants.
    entries: BTreeMap<ScopePath, SharedReducer>,
}

impl ReducerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `reducer` with `path`.
    ///
    /// Fails with [`StoreError::DuplicateRegistration`] when the path is
    /// taken; callers must unregister before registering again.
    pub fn register(&mut self, path: ScopePath, reducer: SharedReducer) -> StoreResult<()> {
        if self.entries.contains_key(&path) {
            return Err(StoreError::DuplicateRegistration(path));
        }
        debug!(scope = %path, "Reducer registered");
        self.entries.insert(path, reducer);
        Ok(())
    }

    /// Removes the reducer at `path`. Absent paths are tolerated.
    pub fn unregister(&mut self, path: &ScopePath) -> Option<SharedReducer> {
        let removed = self.entries.remove(path);
        if removed.is_some() {
            debug!(scope = %path, "Reducer unregistered");
        } else {
            debug!(scope = %path, "Unregister for unknown scope ignored");
        }
        removed
    }

    /// Returns the reducer registered at `path`.
    pub fn get(&self, path: &ScopePath) -> Option<&SharedReducer> {
        self.entries.get(path)
    }

    /// True if a reducer is registered at `path`.
    pub fn contains(&self, path: &ScopePath) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of registered reducers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered paths in routing order.
    pub fn paths(&self) -> impl Iterator<Item = &ScopePath> {
        self.entries.keys()
    }

    /// Object keys leading from the state root to the slot of `path`.
    pub fn slot_keys(&self, path: &ScopePath) -> Vec<String> {
        let segments = path.segments();
        let mut keys = Vec::with_capacity(segments.len());
        for (depth, segment) in segments.iter().enumerate() {
            let owner = ScopePath::new(segments[..depth].iter().cloned());
            if let Some(slot) = self.entries.get(&owner).and_then(|r| r.child_slot(segment)) {
                keys.push(slot.to_string());
            }
            keys.push(segment.clone());
        }
        keys
    }

    /// Delivers `action` to every reducer registered at a prefix of its
    /// scope, writing results back into `state`.
    ///
    /// A reducer registered above the action scope only receives the action
    /// when it [accepts nested actions](Reducer::accepts_nested); otherwise
    /// its slot is materialized and left alone. While a reducer runs, the
    /// slots of the reducers registered below it are detached and put back
    /// afterwards, unless they live in one of its child slots.
    ///
    /// Returns the number of reducers the action was delivered to. Unmatched
    /// actions leave `state` untouched.
    pub fn route(&self, state: &mut Value, action: &Action) -> usize {
        let mut delivered = 0;
        for (path, reducer) in &self.entries {
            let Some(local) = action.localize(path) else {
                continue;
            };
            let keys = self.slot_keys(path);
            let Some(slot) = slot_mut(state, &keys) else {
                warn!(scope = %path, "State slot is not reachable, action dropped");
                continue;
            };
            if slot.is_null() {
                debug!(scope = %path, "Materializing sub-state");
                *slot = reducer.init();
            }
            if !local.is_local() && !reducer.accepts_nested() {
                continue;
            }
            let mut current = std::mem::take(slot);
            let detached =
                self.detach_descendants(path, reducer.as_ref(), keys.len(), &mut current);
            let mut next = reducer.reduce(current, &local);
            for (rest, child) in detached {
                match slot_mut(&mut next, &rest) {
                    Some(target) => *target = child,
                    None => warn!(scope = %path, "Reducer state cannot hold nested state, dropped"),
                }
            }
            *slot = next;
            delivered += 1;
        }
        delivered
    }

    /// Takes the slots of the closest reducers registered below `path` out of
    /// `state`, returning each with its keys relative to `state`. Slots kept
    /// inside one of the owner's child slots stay in place.
    fn detach_descendants(
        &self,
        path: &ScopePath,
        owner: &dyn Reducer,
        depth: usize,
        state: &mut Value,
    ) -> Vec<(Vec<String>, Value)> {
        let below: Vec<&ScopePath> = self
            .entries
            .keys()
            .filter(|other| other.len() > path.len() && other.starts_with(path))
            .collect();
        let mut detached = Vec::new();
        for child in &below {
            let shadowed = below
                .iter()
                .any(|mid| mid.len() < child.len() && child.starts_with(mid));
            let owned = child
                .segments()
                .get(path.len())
                .is_some_and(|segment| owner.child_slot(segment).is_some());
            if shadowed || owned {
                continue;
            }
            let keys = self.slot_keys(child);
            let rest = keys[depth..].to_vec();
            if let Some(value) = take_slot(state, &rest) {
                detached.push((rest, value));
            }
        }
        detached
    }
}

impl fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducerRegistry")
            .field("paths", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Walks `keys` from `state`, creating empty objects for missing containers.
///
/// Returns `None` when a non-object value sits on the way.
pub(crate) fn slot_mut<'a>(state: &'a mut Value, keys: &[String]) -> Option<&'a mut Value> {
    let mut current = state;
    for key in keys {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = current.as_object_mut()?.entry(key.clone()).or_insert(Value::Null);
    }
    Some(current)
}

/// Removes the value at `keys` from `state`, if present.
fn take_slot(state: &mut Value, keys: &[String]) -> Option<Value> {
    let (last, parents) = keys.split_last()?;
    let container = parents
        .iter()
        .try_fold(state, |current, key| current.as_object_mut()?.get_mut(key))?;
    container.as_object_mut()?.remove(last)
}

/// Read-only counterpart of [`slot_mut`].
pub(crate) fn slot<'a>(state: &'a Value, keys: &[String]) -> Option<&'a Value> {
    keys.iter().try_fold(state, |current, key| current.as_object()?.get(key))
}
