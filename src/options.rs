//! Store options
//!
//! Layered configuration for the session toggles: built-in defaults, then an
//! optional TOML options file, then `SETTINGS_STORE_*` environment variables.

use crate::codec::Format;
use crate::error::ConfigurationError;
use crate::sanitize::ShapeMismatchPolicy;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Toggles accepted by `SessionBuilder::options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub autosave_on_change: bool,
    pub autosave_on_exit: bool,
    pub sanitize_on_load: bool,
    pub sanitize_on_save: bool,
    pub format: Option<Format>,
    pub shape_mismatch: ShapeMismatchPolicy,
}

impl SessionOptions {
    /// Composite toggle: autosave on change and on exit.
    pub fn with_autosave(mut self, enabled: bool) -> Self {
        self.autosave_on_change = enabled;
        self.autosave_on_exit = enabled;
        self
    }

    /// Composite toggle: sanitize on load and on save.
    pub fn with_auto_sanitize(mut self, enabled: bool) -> Self {
        self.sanitize_on_load = enabled;
        self.sanitize_on_save = enabled;
        self
    }
}

pub const DEFAULT_ENV_PREFIX: &str = "SETTINGS_STORE";

/// Loads `SessionOptions` from an options file and the environment.
#[derive(Debug, Clone)]
pub struct OptionsLoader {
    env_prefix: String,
    file: Option<PathBuf>,
}

impl Default for OptionsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsLoader {
    pub fn new() -> Self {
        OptionsLoader {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            file: None,
        }
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// TOML options file. It must exist when given.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn load(&self) -> Result<SessionOptions, ConfigurationError> {
        let mut builder = Config::builder()
            .set_default("autosave_on_change", false)?
            .set_default("autosave_on_exit", false)?
            .set_default("sanitize_on_load", false)?
            .set_default("sanitize_on_save", false)?
            .set_default("shape_mismatch", "keep")?;

        if let Some(path) = &self.file {
            debug!(options_file = %path.display(), "Reading store options file");
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml));
        }
        builder = builder.add_source(Environment::with_prefix(&self.env_prefix).try_parsing(true));

        let config = builder.build()?;
        let autosave = config.get_bool("autosave").unwrap_or(false);
        let auto_sanitize = config.get_bool("auto_sanitize").unwrap_or(false);

        let mut options: SessionOptions = config.try_deserialize()?;
        if autosave {
            options = options.with_autosave(true);
        }
        if auto_sanitize {
            options = options.with_auto_sanitize(true);
        }
        Ok(options)
    }
}
