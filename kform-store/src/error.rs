//! Error types for the store layer.

use kform_types::ScopePath;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A reducer is already registered at this scope path.
    #[error("reducer already registered at scope '{0}'")]
    DuplicateRegistration(ScopePath),

    /// A typed message could not be turned into an action envelope.
    #[error("invalid action: {0}")]
    InvalidAction(#[from] kform_types::Error),
}
