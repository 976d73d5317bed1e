//! Error types for the settings store.

use crate::codec::Format;
use crate::tracking::CallbackId;
use crate::tree::KeyPath;
use std::path::PathBuf;
use thiserror::Error;

/// Construction-time errors. A session is never built when one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("You must provide a path or both a read path and a write path")]
    MissingPath,

    #[error("You must provide a path or a read path and a write path, not both")]
    ConflictingPaths,

    #[error("Unsupported format: {0} (supported: json, yaml, toml, ini)")]
    UnsupportedFormat(String),

    #[error(
        "Read and write paths must share a file extension when no format is given: {read:?} vs {write:?}"
    )]
    ExtensionMismatch { read: PathBuf, write: PathBuf },

    #[error("Support for the {0} format is not compiled in (enable the `{0}` feature)")]
    MissingFormatSupport(Format),

    #[error("Invalid default settings: {0}")]
    InvalidDefaults(String),

    #[error("Invalid store options: {0}")]
    Options(String),

    #[error("Invalid logging configuration: {0}")]
    Logging(String),
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        ConfigurationError::Options(err.to_string())
    }
}

/// Errors raised by views, the reconciliation engine, codecs and the session.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to decode {format} settings: {message}")]
    Decode { format: Format, message: String },

    #[error("Failed to encode settings as {format}: {message}")]
    Encode { format: Format, message: String },

    #[error("Error while reading settings from {path:?}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error while writing settings to {path:?}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings do not fit the {format} layout: {reason}")]
    StructuralFormatMismatch { format: Format, reason: String },

    #[error("Sanitization failed at '{path}'")]
    Sanitization {
        path: KeyPath,
        #[source]
        source: Box<SettingsError>,
    },

    #[error("Callback not found: {0}")]
    CallbackNotRegistered(CallbackId),

    #[error("Key not found: '{0}'")]
    KeyNotFound(KeyPath),

    #[error("Expected a {expected} at '{path}', found a {found}")]
    TypeMismatch {
        path: KeyPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Object mapping failed: {0}")]
    Mapping(#[from] serde_json::Error),
}

impl SettingsError {
    /// Whether this error was raised by the codec or file layer rather than the in-memory tree.
    pub fn is_io_related(&self) -> bool {
        matches!(
            self,
            SettingsError::Load { .. }
                | SettingsError::Save { .. }
                | SettingsError::Decode { .. }
                | SettingsError::Encode { .. }
        )
    }
}

pub type Result<T, E = SettingsError> = std::result::Result<T, E>;
