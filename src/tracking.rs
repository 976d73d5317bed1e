//! Change-Tracking Container
//!
//! Views over a settings tree that notify a shared callback registry on every
//! mutation, at any depth. A view is a (tree, path, registry) triple: child views
//! are created on access and address the very same node as their parent, so the
//! raw tree is always up to date and can be serialized at any time.
//!
//! Views never own a copy of the registry. Callbacks added after a nested view
//! was created still fire for that view's mutations.
//!
//! A view whose path runs through a sequence index is tied to the element that
//! sat at that index when the view was created. Once elements of any sequence in
//! the tree shift (insert before the end, remove), such views fail with
//! `KeyNotFound` instead of addressing whatever element moved into the slot.

mod mapping;
mod registry;
mod sequence;
mod set;

pub(crate) use mapping::WeakMappingView;
pub use mapping::MappingView;
pub use registry::{CallbackId, NotificationGuard, Registry};
pub use sequence::SequenceView;
pub use set::SetView;

use crate::error::{Result, SettingsError};
use crate::tree::{self, kind_name, KeyPath, Segment};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// What a view hands out for a child node.
///
/// Containers come back as views sharing the registry; scalars are copied out.
#[derive(Clone)]
pub enum Item {
    Scalar(Value),
    Mapping(MappingView),
    Sequence(SequenceView),
}

impl Item {
    /// Plain value of the child, unwrapping views.
    pub fn to_plain(&self) -> Result<Value> {
        match self {
            Item::Scalar(value) => Ok(value.clone()),
            Item::Mapping(view) => view.to_plain(),
            Item::Sequence(view) => view.to_plain(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Item::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_mapping(self) -> Option<MappingView> {
        match self {
            Item::Mapping(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_sequence(self) -> Option<SequenceView> {
        match self {
            Item::Sequence(view) => Some(view),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Item::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Item::Mapping(view) => f.debug_tuple("Mapping").field(&view.path().to_string()).finish(),
            Item::Sequence(view) => f.debug_tuple("Sequence").field(&view.path().to_string()).finish(),
        }
    }
}

/// State shared by all view variants.
#[derive(Clone)]
pub(crate) struct ViewCore {
    root: Rc<RefCell<Value>>,
    /// Bumped whenever sequence elements in this tree change position.
    layout: Rc<Cell<u64>>,
    /// Layout generation this view was resolved against, for index paths.
    pinned: Cell<Option<u64>>,
    path: KeyPath,
    registry: Rc<Registry>,
}

impl ViewCore {
    pub(crate) fn new(root: Rc<RefCell<Value>>, path: KeyPath, registry: Rc<Registry>) -> Self {
        Self::from_parts(root, Rc::new(Cell::new(0)), path, registry)
    }

    pub(crate) fn from_parts(
        root: Rc<RefCell<Value>>,
        layout: Rc<Cell<u64>>,
        path: KeyPath,
        registry: Rc<Registry>,
    ) -> Self {
        let indexed = path
            .segments()
            .iter()
            .any(|segment| matches!(segment, Segment::Index(_)));
        let pinned = Cell::new(indexed.then(|| layout.get()));
        ViewCore {
            root,
            layout,
            pinned,
            path,
            registry,
        }
    }

    pub(crate) fn path(&self) -> &KeyPath {
        &self.path
    }

    pub(crate) fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub(crate) fn root(&self) -> &Rc<RefCell<Value>> {
        &self.root
    }

    pub(crate) fn layout(&self) -> &Rc<Cell<u64>> {
        &self.layout
    }

    /// View of another node in the same tree.
    pub(crate) fn at(&self, path: KeyPath) -> ViewCore {
        Self::from_parts(
            Rc::clone(&self.root),
            Rc::clone(&self.layout),
            path,
            Rc::clone(&self.registry),
        )
    }

    fn descend(&self, segment: Segment) -> ViewCore {
        self.at(self.path.child(segment))
    }

    /// Record that sequence elements moved. Other index-bearing views go stale;
    /// this one stays valid since its own path was not shifted.
    pub(crate) fn reindexed(&self) {
        let next = self.layout.get().wrapping_add(1);
        self.layout.set(next);
        if self.pinned.get().is_some() {
            self.pinned.set(Some(next));
        }
    }

    fn ensure_current(&self) -> Result<()> {
        match self.pinned.get() {
            Some(generation) if generation != self.layout.get() => {
                Err(SettingsError::KeyNotFound(self.path.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Wrap a child node: containers become views, scalars are cloned.
    pub(crate) fn item(&self, segment: Segment, value: &Value) -> Item {
        match value {
            Value::Object(_) => Item::Mapping(MappingView::from_core(self.descend(segment))),
            Value::Array(_) => Item::Sequence(SequenceView::from_core(self.descend(segment))),
            scalar => Item::Scalar(scalar.clone()),
        }
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Value) -> Result<R>) -> Result<R> {
        self.ensure_current()?;
        let root = self.root.borrow();
        let node = tree::lookup(&root, &self.path)?;
        f(node)
    }

    /// Run a mutation, then notify. Nothing fires if `f` fails.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Value) -> Result<R>) -> Result<R> {
        self.mutate_if(|node| f(node).map(|result| (result, true)))
    }

    /// Like `mutate`, but `f` reports whether the node actually changed.
    pub(crate) fn mutate_if<R>(
        &self,
        f: impl FnOnce(&mut Value) -> Result<(R, bool)>,
    ) -> Result<R> {
        self.ensure_current()?;
        let (result, changed) = {
            let mut root = self.root.borrow_mut();
            let node = tree::lookup_mut(&mut root, &self.path)?;
            f(node)?
        };
        if changed {
            self.registry.notify()?;
        }
        Ok(result)
    }

    pub(crate) fn read_map<R>(&self, f: impl FnOnce(&Map<String, Value>) -> Result<R>) -> Result<R> {
        let path = &self.path;
        self.read(|node| match node {
            Value::Object(map) => f(map),
            other => Err(mismatch(path, "mapping", other)),
        })
    }

    pub(crate) fn read_seq<R>(&self, f: impl FnOnce(&Vec<Value>) -> Result<R>) -> Result<R> {
        let path = &self.path;
        self.read(|node| match node {
            Value::Array(items) => f(items),
            other => Err(mismatch(path, "sequence", other)),
        })
    }

    pub(crate) fn mutate_map<R>(
        &self,
        f: impl FnOnce(&mut Map<String, Value>) -> Result<R>,
    ) -> Result<R> {
        let path = self.path.clone();
        self.mutate(|node| match node {
            Value::Object(map) => f(map),
            other => Err(mismatch(&path, "mapping", other)),
        })
    }

    pub(crate) fn mutate_seq_if<R>(
        &self,
        f: impl FnOnce(&mut Vec<Value>) -> Result<(R, bool)>,
    ) -> Result<R> {
        let path = self.path.clone();
        self.mutate_if(|node| match node {
            Value::Array(items) => f(items),
            other => Err(mismatch(&path, "sequence", other)),
        })
    }

    pub(crate) fn to_plain(&self) -> Result<Value> {
        self.read(|node| Ok(node.clone()))
    }

    pub(crate) fn add_callback<F>(&self, handler: F) -> CallbackId
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.registry.add(handler)
    }

    pub(crate) fn remove_callback(&self, id: CallbackId) -> Result<()> {
        self.registry.remove(id)
    }

    pub(crate) fn suspend_notifications(&self) -> NotificationGuard {
        NotificationGuard::suspend(Rc::clone(&self.registry))
    }

    pub(crate) fn shares_registry_with(&self, other: &ViewCore) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }
}

pub(crate) fn mismatch(path: &KeyPath, expected: &'static str, found: &Value) -> SettingsError {
    SettingsError::TypeMismatch {
        path: path.clone(),
        expected,
        found: kind_name(found),
    }
}

/// Implements the callback and notification surface shared by every view type.
macro_rules! impl_tracking_surface {
    ($view:ty) => {
        impl $view {
            /// Location of this view inside the tree.
            pub fn path(&self) -> &crate::tree::KeyPath {
                self.core.path()
            }

            /// Plain copy of the wrapped node. Never notifies.
            pub fn to_plain(&self) -> crate::error::Result<serde_json::Value> {
                self.core.to_plain()
            }

            /// Register a change handler on the shared registry.
            pub fn add_callback<F>(&self, handler: F) -> crate::tracking::CallbackId
            where
                F: Fn() -> crate::error::Result<()> + 'static,
            {
                self.core.add_callback(handler)
            }

            pub fn remove_callback(
                &self,
                id: crate::tracking::CallbackId,
            ) -> crate::error::Result<()> {
                self.core.remove_callback(id)
            }

            pub fn callback_count(&self) -> usize {
                self.core.registry().len()
            }

            pub fn notifications_enabled(&self) -> bool {
                self.core.registry().is_enabled()
            }

            pub fn set_notifications_enabled(&self, enabled: bool) {
                self.core.registry().set_enabled(enabled)
            }

            /// Disable notifications until the returned guard is dropped.
            pub fn suspend_notifications(&self) -> crate::tracking::NotificationGuard {
                self.core.suspend_notifications()
            }
        }
    };
}

pub(crate) use impl_tracking_surface;
