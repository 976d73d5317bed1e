//! Settings Tree
//!
//! The raw tree is a plain `serde_json::Value`. Mappings keep insertion order
//! (`preserve_order`) so a decoded file is written back in the same key order.

use crate::error::{Result, SettingsError};
use serde_json::{Map, Value};
use std::fmt;

/// A single step into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

/// Location of a node relative to the root mapping.
///
/// Displayed as a dotted path (`section.key`). Segments are stored separately,
/// so keys that contain a dot are still addressed exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path. Every part is treated as a mapping key.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self {
            segments: dotted.split('.').map(Segment::from).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path one step deeper.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Split into the parent path and the final segment.
    pub fn split_last(&self) -> Option<(KeyPath, &Segment)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            KeyPath {
                segments: parent.to_vec(),
            },
            last,
        ))
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<&str> for KeyPath {
    fn from(dotted: &str) -> Self {
        KeyPath::parse(dotted)
    }
}

impl From<Vec<Segment>> for KeyPath {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

/// Human readable node kind, used in diagnostics.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

pub fn empty_mapping() -> Value {
    Value::Object(Map::new())
}

/// Resolve `path` inside `root`.
pub fn lookup<'a>(root: &'a Value, path: &KeyPath) -> Result<&'a Value> {
    let mut current = root;
    for (depth, segment) in path.segments().iter().enumerate() {
        current = step(current, segment).ok_or_else(|| missing(path, depth))?;
    }
    Ok(current)
}

/// Resolve `path` inside `root` for mutation.
pub fn lookup_mut<'a>(root: &'a mut Value, path: &KeyPath) -> Result<&'a mut Value> {
    let mut current = root;
    for (depth, segment) in path.segments().iter().enumerate() {
        current = step_mut(current, segment).ok_or_else(|| missing(path, depth))?;
    }
    Ok(current)
}

fn step<'a>(value: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
        (Value::Array(items), Segment::Index(index)) => items.get_mut(*index),
        _ => None,
    }
}

fn missing(path: &KeyPath, depth: usize) -> SettingsError {
    SettingsError::KeyNotFound(KeyPath::from(path.segments()[..=depth].to_vec()))
}
