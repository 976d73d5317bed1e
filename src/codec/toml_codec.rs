//! TOML codec.
//!
//! TOML has no null, and integers are signed 64-bit. Datetimes decode as strings.

use super::{decode_error, encode_error, read_text, Format, FormatCodec};
use crate::error::Result;
use crate::tree::KeyPath;
use serde_json::{Map, Value};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl FormatCodec for TomlCodec {
    fn format(&self) -> Format {
        Format::Toml
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Value> {
        let text = read_text(Format::Toml, reader)?;
        let table: toml::Table = toml::from_str(&text).map_err(|e| decode_error(Format::Toml, e))?;
        Ok(toml_to_json(toml::Value::Table(table)))
    }

    fn encode(&self, tree: &Value, writer: &mut dyn Write) -> Result<()> {
        let table = match json_to_toml(tree, &KeyPath::root())? {
            toml::Value::Table(table) => table,
            _ => return Err(encode_error(Format::Toml, "top level must be a table")),
        };
        let text = toml::to_string(&table).map_err(|e| encode_error(Format::Toml, e))?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| encode_error(Format::Toml, e))
    }
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

fn json_to_toml(value: &Value, path: &KeyPath) -> Result<toml::Value> {
    Ok(match value {
        Value::Null => {
            return Err(encode_error(
                Format::Toml,
                format!("cannot represent null at '{}'", path),
            ))
        }
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => toml::Value::Integer(i),
            (None, Some(_)) if n.is_u64() => {
                return Err(encode_error(
                    Format::Toml,
                    format!("integer {} at '{}' exceeds the signed 64-bit range", n, path),
                ))
            }
            (None, Some(f)) => toml::Value::Float(f),
            (None, None) => {
                return Err(encode_error(
                    Format::Toml,
                    format!("unsupported number {} at '{}'", n, path),
                ))
            }
        },
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Array(items) => toml::Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| json_to_toml(item, &path.child(i)))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(map) => {
            let mut table = toml::Table::new();
            for (key, child) in map {
                table.insert(key.clone(), json_to_toml(child, &path.child(key.as_str()))?);
            }
            toml::Value::Table(table)
        }
    })
}
