//! Object Mapper
//!
//! Converts typed settings objects to raw trees and back through serde.

use crate::error::{ConfigurationError, Result};
use crate::tree::kind_name;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub fn to_tree<T: Serialize>(object: &T) -> Result<Value> {
    Ok(serde_json::to_value(object)?)
}

pub fn from_tree<T: DeserializeOwned>(tree: Value) -> Result<T> {
    Ok(serde_json::from_value(tree)?)
}

/// Convert an object into a tree usable as defaults: the root must be a mapping.
pub fn defaults_tree<T: Serialize>(object: &T) -> Result<Value> {
    let tree = to_tree(object)?;
    if !tree.is_object() {
        return Err(ConfigurationError::InvalidDefaults(format!(
            "default settings must serialize to a mapping, got a {}",
            kind_name(&tree)
        ))
        .into());
    }
    Ok(tree)
}
