//! YAML codec.

use super::{decode_error, encode_error, expect_mapping, read_text, Format, FormatCodec};
use crate::error::Result;
use crate::tree::empty_mapping;
use serde_json::Value;
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl FormatCodec for YamlCodec {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Value> {
        let text = read_text(Format::Yaml, reader)?;
        if text.trim().is_empty() {
            return Ok(empty_mapping());
        }
        let value: Value =
            serde_yaml::from_str(&text).map_err(|e| decode_error(Format::Yaml, e))?;
        expect_mapping(Format::Yaml, value)
    }

    fn encode(&self, tree: &Value, writer: &mut dyn Write) -> Result<()> {
        serde_yaml::to_writer(writer, tree).map_err(|e| encode_error(Format::Yaml, e))
    }
}
