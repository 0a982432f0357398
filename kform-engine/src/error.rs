//! Error types for the form engine.

use kform_model::SchemaError;
use kform_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while hosting a form.
///
/// Validation failures are not errors; see [`crate::FieldError`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// Registration or dispatch failed in the store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The schema could not be built.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A config file body could not be parsed.
    #[error("invalid form config: {0}")]
    Config(#[from] toml::de::Error),

    /// An action was dispatched through an instance that is not mounted.
    #[error("form '{0}' is not mounted")]
    NotMounted(String),
}
