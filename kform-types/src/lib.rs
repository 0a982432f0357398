//! Core type definitions for kform.
//!
//! This crate defines the fundamental, form-agnostic types used throughout
//! the engine:
//! - [`ScopePath`]: structural address of a node in the state tree
//! - [`Action`]: the action envelope (explicit scope + type + JSON payload)
//! - [`Reducer`]: the contract every scoped state owner implements
//!
//! Form-specific types (schemas, models, form actions) belong in
//! `kform-model` and `kform-engine`, not here.

mod action;
mod reducer;
mod scope;

pub use action::Action;
pub use reducer::{reducer_fn, FnReducer, Reducer, SharedReducer};
pub use scope::ScopePath;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid scope path: {0}")]
    InvalidScope(String),

    #[error("malformed action: {0}")]
    MalformedAction(String),
}
