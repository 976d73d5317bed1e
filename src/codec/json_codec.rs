//! JSON codec. Output is indented with four spaces.

use super::{decode_error, encode_error, expect_mapping, Format, FormatCodec};
use crate::error::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl FormatCodec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Value> {
        let value: Value =
            serde_json::from_reader(reader).map_err(|e| decode_error(Format::Json, e))?;
        expect_mapping(Format::Json, value)
    }

    fn encode(&self, tree: &Value, writer: &mut dyn Write) -> Result<()> {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        tree.serialize(&mut serializer)
            .map_err(|e| encode_error(Format::Json, e))
    }
}
