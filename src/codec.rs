//! Format Codec Adapters
//!
//! One codec per supported file format. A codec turns file bytes into a raw
//! settings tree and back. The root of every tree is a mapping.

mod json_codec;
#[cfg(feature = "ini")]
mod ini_codec;
#[cfg(feature = "toml")]
mod toml_codec;
#[cfg(feature = "yaml")]
mod yaml_codec;

pub use json_codec::JsonCodec;
#[cfg(feature = "ini")]
pub use ini_codec::IniCodec;
#[cfg(feature = "toml")]
pub use toml_codec::TomlCodec;
#[cfg(feature = "yaml")]
pub use yaml_codec::YamlCodec;

use crate::error::{ConfigurationError, Result, SettingsError};
use crate::tree::{empty_mapping, kind_name};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Supported settings file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
    Toml,
    Ini,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Json, Format::Yaml, Format::Toml, Format::Ini];

    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
            Format::Ini => "ini",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        self.name()
    }

    /// Format implied by a path's extension.
    pub fn from_extension(path: &Path) -> Result<Format, ConfigurationError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ConfigurationError::UnsupportedFormat(path.display().to_string()))?;
        match extension {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "ini" => Ok(Format::Ini),
            other => Err(ConfigurationError::UnsupportedFormat(format!(".{}", other))),
        }
    }

    /// Derive the format when none was given. Both paths must share an extension.
    pub fn detect(read_path: &Path, write_path: &Path) -> Result<Format, ConfigurationError> {
        if read_path.extension() != write_path.extension() {
            return Err(ConfigurationError::ExtensionMismatch {
                read: read_path.to_path_buf(),
                write: write_path.to_path_buf(),
            });
        }
        Format::from_extension(read_path)
    }

    /// Whether support for this format was compiled in.
    pub fn is_available(&self) -> bool {
        match self {
            Format::Json => true,
            Format::Yaml => cfg!(feature = "yaml"),
            Format::Toml => cfg!(feature = "toml"),
            Format::Ini => cfg!(feature = "ini"),
        }
    }

    /// Codec for this format.
    pub fn codec(&self) -> Result<Box<dyn FormatCodec>, ConfigurationError> {
        match self {
            Format::Json => Ok(Box::new(JsonCodec)),
            #[cfg(feature = "yaml")]
            Format::Yaml => Ok(Box::new(YamlCodec)),
            #[cfg(feature = "toml")]
            Format::Toml => Ok(Box::new(TomlCodec)),
            #[cfg(feature = "ini")]
            Format::Ini => Ok(Box::new(IniCodec)),
            #[allow(unreachable_patterns)]
            missing => Err(ConfigurationError::MissingFormatSupport(*missing)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            "ini" => Ok(Format::Ini),
            other => Err(ConfigurationError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Reads and writes one file format.
pub trait FormatCodec {
    fn format(&self) -> Format;

    /// Decode a whole document. The root must be a mapping.
    fn decode(&self, reader: &mut dyn Read) -> Result<Value>;

    /// Encode `tree`, failing on shapes the format cannot represent.
    fn encode(&self, tree: &Value, writer: &mut dyn Write) -> Result<()>;

    /// Structural constraints checked before any write is attempted.
    fn check_shape(&self, tree: &Value) -> Result<()> {
        if tree.is_object() {
            Ok(())
        } else {
            Err(SettingsError::StructuralFormatMismatch {
                format: self.format(),
                reason: format!("top level must be a mapping, found a {}", kind_name(tree)),
            })
        }
    }
}

pub(crate) fn decode_error(format: Format, message: impl fmt::Display) -> SettingsError {
    SettingsError::Decode {
        format,
        message: message.to_string(),
    }
}

pub(crate) fn encode_error(format: Format, message: impl fmt::Display) -> SettingsError {
    SettingsError::Encode {
        format,
        message: message.to_string(),
    }
}

pub(crate) fn read_text(format: Format, reader: &mut dyn Read) -> Result<String> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| decode_error(format, e))?;
    Ok(text)
}

/// Accept a decoded root: mappings pass, an empty document becomes an empty mapping.
pub(crate) fn expect_mapping(format: Format, value: Value) -> Result<Value> {
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(empty_mapping()),
        other => Err(decode_error(
            format,
            format!("top level must be a mapping, found a {}", kind_name(&other)),
        )),
    }
}
