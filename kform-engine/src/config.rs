//! Form behavior settings, loadable from a `kform.toml` file.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Behavior switches shared by form instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Restore defaults after a successful submit.
    pub reset_on_submit: bool,
    /// Restore defaults when the form is cancelled.
    pub reset_on_cancel: bool,
    /// Focus the first visible field when the form mounts.
    pub focus_first_on_mount: bool,
    /// Focus the first field with an async error when errors arrive.
    pub focus_on_async_error: bool,
    /// Focus the first invalid field when a submit is blocked.
    pub focus_on_blocked_submit: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            reset_on_submit: true,
            reset_on_cancel: true,
            focus_first_on_mount: true,
            focus_on_async_error: true,
            focus_on_blocked_submit: true,
        }
    }
}

/// Layout of the config file: settings live under `[form]`.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    form: FormConfig,
}

impl FormConfig {
    /// Parses a config file body.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.form)
    }

    /// Loads settings from `path`. A missing or malformed file yields the
    /// defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No form config at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded form config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse form config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read form config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
