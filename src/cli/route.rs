//! CLI route: builds the session for a run and dispatches commands to it.

use crate::cli::parse::{Cli, Commands};
use crate::cli::presentation::{format_plan, format_value};
use crate::codec::Format;
use crate::error::{ConfigurationError, Result, SettingsError};
use crate::options::{OptionsLoader, SessionOptions};
use crate::session::Session;
use crate::tree::{empty_mapping, KeyPath};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Runtime context for one CLI invocation.
pub struct RunContext {
    session: Session,
}

impl RunContext {
    /// Open (or create) the settings file named on the command line.
    pub fn new(cli: &Cli) -> Result<Self> {
        let mut options = load_options(cli.options.as_deref())?;
        if cli.format.is_some() {
            options.format = cli.format;
        }
        let defaults = match &cli.defaults {
            Some(path) => read_defaults(path)?,
            None => empty_mapping(),
        };

        let session = Session::builder()
            .path(&cli.file)
            .defaults(defaults)
            .options(options)
            .build()?;
        Ok(RunContext { session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one command and return its output.
    pub fn execute(&mut self, command: &Commands) -> Result<String> {
        debug!(?command, "Executing command");
        let settings = self.session.settings();
        match command {
            Commands::Show => Ok(format_value(&settings.to_plain()?)),
            Commands::Get { path } => {
                let value = settings.get_path(&KeyPath::parse(path))?.to_plain()?;
                Ok(format_value(&value))
            }
            Commands::Set { path, value } => {
                let key_path = KeyPath::parse(path);
                settings.set_path(&key_path, parse_value(value))?;
                self.session.save()?;
                info!(path = %key_path, "Setting stored");
                Ok(format!("Set {}", key_path))
            }
            Commands::Unset { path } => {
                let key_path = KeyPath::parse(path);
                settings.remove_path(&key_path)?;
                self.session.save()?;
                Ok(format!("Removed {}", key_path))
            }
            Commands::Diff => Ok(format_plan(&self.session.plan_sanitize()?)),
            Commands::Sanitize => {
                let applied = self.session.sanitize()?;
                self.session.save()?;
                Ok(format_plan(&applied))
            }
            Commands::Reset => {
                self.session.restore_defaults()?;
                self.session.save()?;
                Ok(format!(
                    "Restored defaults in {}",
                    self.session.write_path().display()
                ))
            }
        }
    }
}

fn load_options(file: Option<&Path>) -> Result<SessionOptions, ConfigurationError> {
    let loader = OptionsLoader::new();
    match file {
        Some(path) => loader.file(path).load(),
        None => loader.load(),
    }
}

/// Decode a defaults file with the codec its extension names.
fn read_defaults(path: &Path) -> Result<Value> {
    let codec = Format::from_extension(path)?.codec()?;
    let bytes = fs::read(path).map_err(|source| SettingsError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    codec.decode(&mut bytes.as_slice())
}

/// JSON if it parses, otherwise the raw text as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
