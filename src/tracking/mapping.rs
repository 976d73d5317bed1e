//! Mapping view: string keys to child nodes.

use super::{impl_tracking_surface, mismatch, Item, Registry, SequenceView, SetView, ViewCore};
use crate::error::{Result, SettingsError};
use crate::tree::{self, KeyPath, Segment};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Change-tracking view over a mapping node.
#[derive(Clone)]
pub struct MappingView {
    pub(super) core: ViewCore,
}

impl_tracking_surface!(MappingView);

impl MappingView {
    /// Wrap a fresh tree with its own, empty registry.
    pub fn new(map: Map<String, Value>) -> Self {
        Self::with_registry(map, Rc::new(Registry::new()))
    }

    pub(crate) fn with_registry(map: Map<String, Value>, registry: Rc<Registry>) -> Self {
        let root = Rc::new(RefCell::new(Value::Object(map)));
        MappingView {
            core: ViewCore::new(root, KeyPath::root(), registry),
        }
    }

    pub(crate) fn from_core(core: ViewCore) -> Self {
        MappingView { core }
    }

    /// Handle that does not keep the tree or its registry alive.
    pub(crate) fn downgrade(&self) -> WeakMappingView {
        WeakMappingView {
            root: Rc::downgrade(self.core.root()),
            layout: Rc::downgrade(self.core.layout()),
            path: self.core.path().clone(),
            registry: Rc::downgrade(self.core.registry()),
        }
    }

    /// Whether both views notify through the same registry object.
    pub fn shares_registry_with(&self, other: &MappingView) -> bool {
        self.core.shares_registry_with(&other.core)
    }

    pub fn get(&self, key: &str) -> Result<Item> {
        self.core.read_map(|map| {
            let value = map
                .get(key)
                .ok_or_else(|| SettingsError::KeyNotFound(self.core.path().child(key)))?;
            Ok(self.core.item(Segment::from(key), value))
        })
    }

    /// Plain copy of a child.
    pub fn get_value(&self, key: &str) -> Result<Value> {
        self.get(key)?.to_plain()
    }

    /// Deserialize a child into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get_value(key)?)?)
    }

    /// Child view of a nested mapping.
    pub fn mapping(&self, key: &str) -> Result<MappingView> {
        let path = self.core.path().child(key);
        match self.get(key)? {
            Item::Mapping(view) => Ok(view),
            other => Err(mismatch(&path, "mapping", &other.to_plain()?)),
        }
    }

    /// Child view of a nested sequence.
    pub fn sequence(&self, key: &str) -> Result<SequenceView> {
        let path = self.core.path().child(key);
        match self.get(key)? {
            Item::Sequence(view) => Ok(view),
            other => Err(mismatch(&path, "sequence", &other.to_plain()?)),
        }
    }

    /// Treat a nested sequence as a set of unique values.
    pub fn set_view(&self, key: &str) -> Result<SetView> {
        Ok(SetView::from_sequence(self.sequence(key)?))
    }

    /// Store `value` under `key` and notify.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.core.mutate_map(|map| {
            map.insert(key.to_string(), value);
            Ok(())
        })
    }

    /// Serialize `value` and store it under `key`.
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set(key, serde_json::to_value(value)?)
    }

    /// Remove `key`, returning its plain value.
    pub fn remove(&self, key: &str) -> Result<Value> {
        let path = self.core.path().child(key);
        self.core.mutate_map(|map| {
            map.shift_remove(key)
                .ok_or(SettingsError::KeyNotFound(path))
        })
    }

    pub fn contains_key(&self, key: &str) -> Result<bool> {
        self.core.read_map(|map| Ok(map.contains_key(key)))
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.core.read_map(|map| Ok(map.keys().cloned().collect()))
    }

    pub fn len(&self) -> Result<usize> {
        self.core.read_map(|map| Ok(map.len()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.core.read_map(|map| Ok(map.is_empty()))
    }

    /// Child at a path relative to this view.
    pub fn get_path(&self, path: &KeyPath) -> Result<Item> {
        let Some((parent, last)) = path.split_last() else {
            return Ok(Item::Mapping(self.clone()));
        };
        let full = self.absolute(path);
        self.core.read(|node| {
            let parent = tree::lookup(node, &parent).map_err(|_| SettingsError::KeyNotFound(full.clone()))?;
            let value = match (parent, last) {
                (Value::Object(map), Segment::Key(key)) => map.get(key),
                (Value::Array(items), Segment::Index(index)) => items.get(*index),
                _ => None,
            }
            .ok_or_else(|| SettingsError::KeyNotFound(full.clone()))?;
            let core = self.core.at(full.clone());
            Ok(match value {
                Value::Object(_) => Item::Mapping(MappingView::from_core(core)),
                Value::Array(_) => Item::Sequence(SequenceView::from_core(core)),
                scalar => Item::Scalar(scalar.clone()),
            })
        })
    }

    /// Store `value` at a path relative to this view. The parent must exist.
    ///
    /// A mapping parent gains or replaces the key; a sequence parent has the
    /// element at that index replaced.
    pub fn set_path(&self, path: &KeyPath, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (parent, last) = self.split(path)?;
        let full = self.absolute(path);
        let parent_full = self.absolute(&parent);
        self.core.mutate(|node| {
            let parent = tree::lookup_mut(node, &parent).map_err(|_| SettingsError::KeyNotFound(full.clone()))?;
            match (parent, last) {
                (Value::Object(map), Segment::Key(key)) => {
                    map.insert(key.clone(), value);
                    Ok(())
                }
                (Value::Array(items), Segment::Index(index)) => {
                    let slot = items
                        .get_mut(*index)
                        .ok_or_else(|| SettingsError::KeyNotFound(full.clone()))?;
                    *slot = value;
                    Ok(())
                }
                (Value::Array(_), Segment::Key(_)) => Err(SettingsError::TypeMismatch {
                    path: parent_full,
                    expected: "mapping",
                    found: "sequence",
                }),
                (other, _) => Err(mismatch(&parent_full, "container", other)),
            }
        })
    }

    /// Remove the node at a path relative to this view.
    pub fn remove_path(&self, path: &KeyPath) -> Result<Value> {
        let (parent, last) = self.split(path)?;
        let full = self.absolute(path);
        self.core.mutate(|node| {
            let parent = tree::lookup_mut(node, &parent).map_err(|_| SettingsError::KeyNotFound(full.clone()))?;
            match (parent, last) {
                (Value::Object(map), Segment::Key(key)) => map.shift_remove(key),
                (Value::Array(items), Segment::Index(index)) if *index < items.len() => {
                    let removed = items.remove(*index);
                    self.core.reindexed();
                    Some(removed)
                }
                _ => None,
            }
            .ok_or(SettingsError::KeyNotFound(full))
        })
    }

    /// Swap the whole content of this mapping. Notifies once.
    pub fn replace_all(&self, map: Map<String, Value>) -> Result<()> {
        self.core.mutate_map(|current| {
            *current = map;
            Ok(())
        })
    }

    fn split<'p>(&self, path: &'p KeyPath) -> Result<(KeyPath, &'p Segment)> {
        path.split_last()
            .ok_or_else(|| SettingsError::KeyNotFound(self.core.path().clone()))
    }

    fn absolute(&self, relative: &KeyPath) -> KeyPath {
        relative
            .segments()
            .iter()
            .cloned()
            .fold(self.core.path().clone(), |path, segment| path.child(segment))
    }
}

/// Non-owning counterpart of `MappingView`, for handlers stored in the registry.
pub(crate) struct WeakMappingView {
    root: Weak<RefCell<Value>>,
    layout: Weak<Cell<u64>>,
    path: KeyPath,
    registry: Weak<Registry>,
}

impl WeakMappingView {
    pub(crate) fn upgrade(&self) -> Option<MappingView> {
        let root = self.root.upgrade()?;
        let layout = self.layout.upgrade()?;
        let registry = self.registry.upgrade()?;
        Some(MappingView::from_core(ViewCore::from_parts(
            root,
            layout,
            self.path.clone(),
            registry,
        )))
    }
}

impl std::fmt::Debug for MappingView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingView")
            .field("path", &self.core.path().to_string())
            .finish()
    }
}
