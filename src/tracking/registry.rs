//! Callback registry shared by every view of one settings tree.

use crate::error::{Result, SettingsError};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Handle returned by `add_callback`, used to remove the callback again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback#{}", self.0)
    }
}

type Handler = Rc<dyn Fn() -> Result<()>>;

/// Ordered list of zero-argument change handlers.
///
/// One registry exists per tree. Views hold an `Rc` to it and never a copy, so a
/// callback added through any view is seen by every other view of the same tree.
pub struct Registry {
    handlers: RefCell<Vec<(CallbackId, Handler)>>,
    next_id: Cell<u64>,
    enabled: Cell<bool>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            enabled: Cell::new(true),
        }
    }

    pub fn add<F>(&self, handler: F) -> CallbackId
    where
        F: Fn() -> Result<()> + 'static,
    {
        let id = CallbackId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        debug!(callback = %id, "Callback registered");
        id
    }

    pub fn remove(&self, id: CallbackId) -> Result<()> {
        let mut handlers = self.handlers.borrow_mut();
        let position = handlers
            .iter()
            .position(|(registered, _)| *registered == id)
            .ok_or(SettingsError::CallbackNotRegistered(id))?;
        handlers.remove(position);
        debug!(callback = %id, "Callback removed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Toggle notification delivery. Changing the toggle never notifies.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Fire every handler in registration order.
    ///
    /// All handlers run even if one fails; the first failure is returned.
    pub fn notify(&self) -> Result<()> {
        if !self.enabled.get() {
            return Ok(());
        }

        // Snapshot so handlers may add or remove callbacks while running.
        let handlers: Vec<(CallbackId, Handler)> = self.handlers.borrow().clone();
        let mut first_error = None;
        for (id, handler) in handlers {
            if let Err(err) = handler() {
                debug!(callback = %id, error = %err, "Callback failed");
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Restores the previous notification state when dropped.
#[must_use = "notifications resume as soon as the guard is dropped"]
pub struct NotificationGuard {
    registry: Rc<Registry>,
    previous: bool,
}

impl NotificationGuard {
    pub(crate) fn suspend(registry: Rc<Registry>) -> Self {
        let previous = registry.is_enabled();
        registry.set_enabled(false);
        NotificationGuard { registry, previous }
    }
}

impl Drop for NotificationGuard {
    fn drop(&mut self) {
        self.registry.set_enabled(self.previous);
    }
}
