//! Root store and scoped reducer registry for kform.
//!
//! # Architecture
//!
//! A single [`Store`] owns the whole state tree. Independently mounted form
//! instances, and the composite fields nested inside them, register their
//! own reducer at a [`ScopePath`](kform_types::ScopePath). Dispatch runs the
//! optional root reducer over the whole tree, then the [`ReducerRegistry`]
//! delivers the action, with the matched prefix stripped, to the reducer
//! registered at its scope and to any reducer above it that accepts nested
//! actions.
//!
//! Sub-states are materialized lazily from [`Reducer::init`](kform_types::Reducer::init)
//! the first time an action reaches an empty slot.
//!
//! # Example
//!
//! ```
//! use kform_store::{ScopeContext, Store};
//! use kform_types::{reducer_fn, Action};
//! use serde_json::{json, Value};
//! use std::rc::Rc;
//!
//! let store = Store::new();
//! let ctx = ScopeContext::root(store.clone()).child("app").child("counter");
//! let counter = reducer_fn(
//!     || json!({"counter": 0}),
//!     |state: Value, action: &Action| match action.kind.as_str() {
//!         "INC" => json!({"counter": state["counter"].as_i64().unwrap_or(0) + 1}),
//!         _ => state,
//!     },
//! );
//! ctx.assoc_reducer(Rc::new(counter)).unwrap();
//! ctx.dispatch("INC", Value::Null);
//! assert_eq!(ctx.select(), Some(json!({"counter": 1})));
//! ```

mod context;
mod error;
mod registry;
mod store;

pub use context::ScopeContext;
pub use error::{StoreError, StoreResult};
pub use registry::ReducerRegistry;
pub use store::{Store, Subscription, SubscriptionId};
