//! Set view: a sequence node holding unique values.
//!
//! Uniqueness is structural equality of the plain values. Inserting a value that
//! is already present, or removing one that is absent, is not a mutation and does
//! not notify.

use super::{impl_tracking_surface, SequenceView, ViewCore};
use crate::error::Result;
use serde_json::Value;

#[derive(Clone)]
pub struct SetView {
    pub(super) core: ViewCore,
}

impl_tracking_surface!(SetView);

impl SetView {
    pub(crate) fn from_sequence(sequence: SequenceView) -> Self {
        SetView {
            core: sequence.core,
        }
    }

    pub fn contains(&self, value: &Value) -> Result<bool> {
        self.core.read_seq(|items| Ok(items.contains(value)))
    }

    /// Returns `true` if the value was not present.
    pub fn insert(&self, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        self.core.mutate_seq_if(|items| {
            if items.contains(&value) {
                return Ok((false, false));
            }
            items.push(value);
            Ok((true, true))
        })
    }

    /// Returns `true` if the value was present.
    pub fn remove(&self, value: &Value) -> Result<bool> {
        self.core.mutate_seq_if(|items| {
            let before = items.len();
            items.retain(|item| item != value);
            let removed = items.len() != before;
            if removed {
                self.core.reindexed();
            }
            Ok((removed, removed))
        })
    }

    pub fn values(&self) -> Result<Vec<Value>> {
        self.core.read_seq(|items| Ok(items.clone()))
    }

    pub fn len(&self) -> Result<usize> {
        self.core.read_seq(|items| Ok(items.len()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.core.read_seq(|items| Ok(items.is_empty()))
    }
}

impl std::fmt::Debug for SetView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetView")
            .field("path", &self.core.path().to_string())
            .finish()
    }
}
