//! INI codec.
//!
//! Exactly two levels: section name to a flat mapping of scalar values. Values
//! are written as text and always decode as strings. Quotes are taken literally.
//! Values with leading or trailing whitespace cannot be read back and are
//! rejected when encoding.

use super::{decode_error, encode_error, read_text, Format, FormatCodec};
use crate::error::{Result, SettingsError};
use crate::tree::kind_name;
use ini::{Ini, ParseOption, Properties};
use serde_json::{Map, Value};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct IniCodec;

impl FormatCodec for IniCodec {
    fn format(&self) -> Format {
        Format::Ini
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Value> {
        let text = read_text(Format::Ini, reader)?;
        let option = ParseOption {
            enabled_quote: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(&text, option).map_err(|e| decode_error(Format::Ini, e))?;

        let mut root = Map::new();
        for (section, properties) in ini.iter() {
            let Some(name) = section else {
                if properties.iter().next().is_some() {
                    return Err(decode_error(Format::Ini, "key outside of any section"));
                }
                continue;
            };
            let entry = root
                .entry(name.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(entries) = entry {
                for (key, value) in properties.iter() {
                    entries.insert(key.to_string(), Value::String(value.to_string()));
                }
            }
        }
        Ok(Value::Object(root))
    }

    fn encode(&self, tree: &Value, writer: &mut dyn Write) -> Result<()> {
        self.check_shape(tree)?;
        let Value::Object(sections) = tree else {
            return Err(encode_error(Format::Ini, "top level must be a mapping"));
        };

        let mut ini = Ini::new();
        for (name, body) in sections {
            let Value::Object(entries) = body else {
                return Err(encode_error(
                    Format::Ini,
                    format!("section '{}' must be a mapping", name),
                ));
            };
            let properties = ini
                .entry(Some(name.clone()))
                .or_insert_with(Properties::new);
            for (key, value) in entries {
                let text = scalar_text(value).ok_or_else(|| {
                    encode_error(
                        Format::Ini,
                        format!(
                            "'{}.{}' is a {}; INI values must be scalars",
                            name,
                            key,
                            kind_name(value)
                        ),
                    )
                })?;
                if text.trim() != text {
                    return Err(encode_error(
                        Format::Ini,
                        format!("'{}.{}' has leading or trailing whitespace", name, key),
                    ));
                }
                properties.insert(key.as_str(), text);
            }
        }

        let mut buffer = Vec::new();
        ini.write_to(&mut buffer)
            .map_err(|e| encode_error(Format::Ini, e))?;
        writer
            .write_all(&buffer)
            .map_err(|e| encode_error(Format::Ini, e))
    }

    fn check_shape(&self, tree: &Value) -> Result<()> {
        let Value::Object(sections) = tree else {
            return Err(SettingsError::StructuralFormatMismatch {
                format: Format::Ini,
                reason: format!("top level must be a mapping, found a {}", kind_name(tree)),
            });
        };
        match sections.iter().find(|(_, body)| !body.is_object()) {
            Some((name, body)) => Err(SettingsError::StructuralFormatMismatch {
                format: Format::Ini,
                reason: format!(
                    "top-level key '{}' is a {}; every top-level key must be a section",
                    name,
                    kind_name(body)
                ),
            }),
            None => Ok(()),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
