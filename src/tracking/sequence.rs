//! Sequence view: ordered list of child nodes.

use super::{impl_tracking_surface, mismatch, Item, MappingView, ViewCore};
use crate::error::{Result, SettingsError};
use crate::tree::Segment;
use serde_json::Value;

/// Change-tracking view over a sequence node.
#[derive(Clone)]
pub struct SequenceView {
    pub(super) core: ViewCore,
}

impl_tracking_surface!(SequenceView);

impl SequenceView {
    pub(crate) fn from_core(core: ViewCore) -> Self {
        SequenceView { core }
    }

    pub fn get(&self, index: usize) -> Result<Item> {
        self.core.read_seq(|items| {
            let value = items.get(index).ok_or_else(|| self.out_of_range(index))?;
            Ok(self.core.item(Segment::Index(index), value))
        })
    }

    pub fn get_value(&self, index: usize) -> Result<Value> {
        self.get(index)?.to_plain()
    }

    pub fn mapping(&self, index: usize) -> Result<MappingView> {
        let path = self.core.path().child(index);
        match self.get(index)? {
            Item::Mapping(view) => Ok(view),
            other => Err(mismatch(&path, "mapping", &other.to_plain()?)),
        }
    }

    pub fn sequence(&self, index: usize) -> Result<SequenceView> {
        let path = self.core.path().child(index);
        match self.get(index)? {
            Item::Sequence(view) => Ok(view),
            other => Err(mismatch(&path, "sequence", &other.to_plain()?)),
        }
    }

    /// Replace the element at `index`.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let missing = self.out_of_range(index);
        self.core.mutate_seq_if(|items| {
            let slot = items.get_mut(index).ok_or(missing)?;
            *slot = value;
            Ok(((), true))
        })
    }

    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.core.mutate_seq_if(|items| {
            items.push(value);
            Ok(((), true))
        })
    }

    /// Insert before `index`; `index == len` appends.
    ///
    /// Inserting before the end invalidates element views taken earlier.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let missing = self.out_of_range(index);
        self.core.mutate_seq_if(|items| {
            if index > items.len() {
                return Err(missing);
            }
            let shifts = index < items.len();
            items.insert(index, value);
            if shifts {
                self.core.reindexed();
            }
            Ok(((), true))
        })
    }

    /// Append every value. Notifies once, and only if something was appended.
    pub fn extend<I, V>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.core.mutate_seq_if(|items| {
            let changed = !values.is_empty();
            items.extend(values);
            Ok(((), changed))
        })
    }

    pub fn remove(&self, index: usize) -> Result<Value> {
        let missing = self.out_of_range(index);
        self.core.mutate_seq_if(|items| {
            if index >= items.len() {
                return Err(missing);
            }
            let removed = items.remove(index);
            self.core.reindexed();
            Ok((removed, true))
        })
    }

    pub fn len(&self) -> Result<usize> {
        self.core.read_seq(|items| Ok(items.len()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.core.read_seq(|items| Ok(items.is_empty()))
    }

    fn out_of_range(&self, index: usize) -> SettingsError {
        SettingsError::KeyNotFound(self.core.path().child(index))
    }
}

impl std::fmt::Debug for SequenceView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceView")
            .field("path", &self.core.path().to_string())
            .finish()
    }
}
