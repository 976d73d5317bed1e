//! Settings Session
//!
//! Binds a change-tracking settings tree to a file. A session loads the file
//! on construction (or creates it from the defaults), saves on demand or on
//! every change, batches mutations into a single save and flushes on exit.
//!
//! Sessions are single-threaded: views and callbacks are `Rc`-based.

use crate::codec::{Format, FormatCodec};
use crate::error::{ConfigurationError, Result, SettingsError};
use crate::mapper;
use crate::options::SessionOptions;
use crate::sanitize::{self, ReconciliationPlan, ShapeMismatchPolicy};
use crate::tracking::{CallbackId, MappingView, WeakMappingView};
use crate::tree::kind_name;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

/// Lifecycle of a session's persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Memory matches the file as last read or written.
    Loaded,
    /// Memory has changes that were not saved.
    Dirty,
    /// A save is in progress.
    Saving,
    /// The last load or save failed.
    Failed,
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    path: Option<PathBuf>,
    read_path: Option<PathBuf>,
    write_path: Option<PathBuf>,
    defaults: Option<Result<Value>>,
    options: SessionOptions,
    codec: Option<Box<dyn FormatCodec>>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    pub fn new() -> Self {
        SessionBuilder {
            path: None,
            read_path: None,
            write_path: None,
            defaults: None,
            options: SessionOptions::default(),
            codec: None,
        }
    }

    /// Read from and write to the same file.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn read_path(mut self, path: impl AsRef<Path>) -> Self {
        self.read_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn write_path(mut self, path: impl AsRef<Path>) -> Self {
        self.write_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Default tree. Its root must be a mapping.
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(Ok(defaults));
        self
    }

    /// Default tree taken from a serializable object.
    pub fn defaults_from<T: Serialize>(mut self, object: &T) -> Self {
        self.defaults = Some(mapper::defaults_tree(object));
        self
    }

    pub fn options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.options.format = Some(format);
        self
    }

    pub fn autosave_on_change(mut self, enabled: bool) -> Self {
        self.options.autosave_on_change = enabled;
        self
    }

    pub fn autosave_on_exit(mut self, enabled: bool) -> Self {
        self.options.autosave_on_exit = enabled;
        self
    }

    pub fn sanitize_on_load(mut self, enabled: bool) -> Self {
        self.options.sanitize_on_load = enabled;
        self
    }

    pub fn sanitize_on_save(mut self, enabled: bool) -> Self {
        self.options.sanitize_on_save = enabled;
        self
    }

    pub fn shape_mismatch(mut self, policy: ShapeMismatchPolicy) -> Self {
        self.options.shape_mismatch = policy;
        self
    }

    /// Composite toggle for `autosave_on_change` and `autosave_on_exit`.
    pub fn autosave(mut self, enabled: bool) -> Self {
        self.options = self.options.with_autosave(enabled);
        self
    }

    /// Composite toggle for `sanitize_on_load` and `sanitize_on_save`.
    pub fn auto_sanitize(mut self, enabled: bool) -> Self {
        self.options = self.options.with_auto_sanitize(enabled);
        self
    }

    /// Use a specific codec instead of the one derived from the format.
    pub fn codec(mut self, codec: Box<dyn FormatCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Validate the configuration, then load the file or create it from the defaults.
    pub fn build(self) -> Result<Session> {
        let (read_path, write_path) = resolve_paths(self.path, self.read_path, self.write_path)?;

        let format = match (&self.codec, self.options.format) {
            (Some(codec), _) => codec.format(),
            (None, Some(format)) => format,
            (None, None) => Format::detect(&read_path, &write_path)?,
        };
        let codec = match self.codec {
            Some(codec) => codec,
            None => format.codec()?,
        };

        let defaults = self.defaults.unwrap_or_else(|| Ok(Value::Object(Map::new())))?;
        if !defaults.is_object() {
            return Err(ConfigurationError::InvalidDefaults(format!(
                "root must be a mapping, found a {}",
                kind_name(&defaults)
            ))
            .into());
        }

        info!(
            read_path = %read_path.display(),
            write_path = %write_path.display(),
            format = %format,
            autosave_on_change = self.options.autosave_on_change,
            autosave_on_exit = self.options.autosave_on_exit,
            sanitize_on_load = self.options.sanitize_on_load,
            sanitize_on_save = self.options.sanitize_on_save,
            "Initializing settings session"
        );

        let shared = Rc::new(Persistence {
            read_path,
            write_path,
            format,
            codec,
            defaults,
            options: self.options,
            state: Cell::new(SessionState::Loaded),
            batch_depth: Cell::new(0),
        });

        let session = if shared.read_path.exists() {
            let root = shared.load_root()?;
            Session::assemble(shared, root)
        } else {
            info!(path = %shared.read_path.display(), "No settings file found, creating one from defaults");
            let root = MappingView::new(shared.defaults_map());
            let session = Session::assemble(shared, root);
            if let Err(e) = session.save() {
                session.flushed.set(true);
                return Err(e);
            }
            session
        };
        Ok(session)
    }
}

fn resolve_paths(
    path: Option<PathBuf>,
    read_path: Option<PathBuf>,
    write_path: Option<PathBuf>,
) -> Result<(PathBuf, PathBuf), ConfigurationError> {
    match (path, read_path, write_path) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(ConfigurationError::ConflictingPaths),
        (Some(path), None, None) => Ok((path.clone(), path)),
        (None, Some(read), Some(write)) => Ok((read, write)),
        _ => Err(ConfigurationError::MissingPath),
    }
}

/// File binding shared between the session and its change handler.
struct Persistence {
    read_path: PathBuf,
    write_path: PathBuf,
    format: Format,
    codec: Box<dyn FormatCodec>,
    defaults: Value,
    options: SessionOptions,
    state: Cell<SessionState>,
    batch_depth: Cell<usize>,
}

impl Persistence {
    fn defaults_map(&self) -> Map<String, Value> {
        match &self.defaults {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Read and decode the file into a fresh tree with a fresh registry.
    fn load_root(&self) -> Result<MappingView> {
        let tree = self.read_tree().inspect_err(|e| {
            error!(path = %self.read_path.display(), error = %e, "Failed to load settings");
            self.state.set(SessionState::Failed);
        })?;
        let map = match tree {
            Value::Object(map) => map,
            other => {
                self.state.set(SessionState::Failed);
                return Err(SettingsError::Decode {
                    format: self.format,
                    message: format!("top level must be a mapping, found a {}", kind_name(&other)),
                });
            }
        };
        let root = MappingView::new(map);
        let mut state = SessionState::Loaded;
        if self.options.sanitize_on_load {
            let applied = sanitize::sanitize(&root, &self.defaults, self.options.shape_mismatch)
                .inspect_err(|e| {
                    error!(path = %self.read_path.display(), error = %e, "Failed to reconcile loaded settings");
                    self.state.set(SessionState::Failed);
                })?;
            if !applied.is_empty() {
                state = SessionState::Dirty;
            }
        }
        self.state.set(state);
        info!(path = %self.read_path.display(), state = ?state, "Settings loaded");
        Ok(root)
    }

    fn read_tree(&self) -> Result<Value> {
        let bytes = fs::read(&self.read_path).map_err(|source| SettingsError::Load {
            path: self.read_path.clone(),
            source,
        })?;
        self.codec.decode(&mut bytes.as_slice())
    }

    /// Encode the tree and write it. Nothing is written unless encoding succeeds.
    fn save(&self, root: &MappingView) -> Result<()> {
        if self.options.sanitize_on_save {
            sanitize::sanitize(root, &self.defaults, self.options.shape_mismatch)?;
        }
        let tree = root.to_plain()?;
        self.codec.check_shape(&tree).inspect_err(|e| {
            warn!(path = %self.write_path.display(), error = %e, "Refusing to save settings");
        })?;

        let previous = self.state.replace(SessionState::Saving);
        match self.write(&tree) {
            Ok(()) => {
                self.state.set(SessionState::Loaded);
                debug!(path = %self.write_path.display(), "Settings saved");
                Ok(())
            }
            Err(e) => {
                error!(path = %self.write_path.display(), error = %e, "Failed to save settings");
                self.state.set(if e.is_io_related() {
                    SessionState::Failed
                } else {
                    previous
                });
                Err(e)
            }
        }
    }

    fn write(&self, tree: &Value) -> Result<()> {
        let mut buffer = Vec::new();
        self.codec.encode(tree, &mut buffer)?;

        let io_error = |source| SettingsError::Save {
            path: self.write_path.clone(),
            source,
        };
        if let Some(parent) = self.write_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(&self.write_path, &buffer).map_err(io_error)
    }

    /// Reaction to any mutation of the tree.
    fn changed(&self, root: &MappingView) -> Result<()> {
        if self.options.autosave_on_change && self.batch_depth.get() == 0 {
            debug!("Autosaving after change");
            self.save(root)
        } else {
            self.state.set(SessionState::Dirty);
            Ok(())
        }
    }
}

/// A settings tree bound to a file.
///
/// Dropping a session with `autosave_on_exit` set saves it one last time;
/// failures are logged. Call [`Session::shutdown`] to observe them instead.
pub struct Session {
    shared: Rc<Persistence>,
    root: MappingView,
    tracker: CallbackId,
    flushed: Cell<bool>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    fn assemble(shared: Rc<Persistence>, root: MappingView) -> Session {
        let tracker = install_tracker(&shared, &root);
        Session {
            shared,
            root,
            tracker,
            flushed: Cell::new(false),
        }
    }

    /// Root view of the live tree. Mutations through it trigger autosave.
    ///
    /// Views obtained before a `load` or `restore_defaults` keep pointing at the
    /// replaced tree and no longer reach the session.
    pub fn settings(&self) -> MappingView {
        self.root.clone()
    }

    /// Replace the live tree with the file's content.
    ///
    /// The new tree starts with an empty callback registry: handlers added to
    /// the old tree are not carried over.
    pub fn load(&mut self) -> Result<()> {
        let root = self.shared.load_root()?;
        self.replace_root(root);
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.shared.save(&self.root)
    }

    /// Reconcile the live tree with the defaults and report what changed.
    pub fn sanitize(&self) -> Result<ReconciliationPlan> {
        let applied = sanitize::sanitize(&self.root, &self.shared.defaults, self.shared.options.shape_mismatch)?;
        if !applied.is_empty() {
            self.shared.changed(&self.root)?;
        }
        Ok(applied)
    }

    /// What `sanitize` would do, without touching the tree.
    pub fn plan_sanitize(&self) -> Result<ReconciliationPlan> {
        let live = self.root.to_plain()?;
        Ok(sanitize::plan(&live, &self.shared.defaults, self.shared.options.shape_mismatch))
    }

    /// Replace the live tree with a copy of the defaults.
    ///
    /// Like `load`, this starts a new callback registry.
    pub fn restore_defaults(&mut self) -> Result<()> {
        info!("Restoring default settings");
        let root = MappingView::new(self.shared.defaults_map());
        self.replace_root(root);
        self.shared.changed(&self.root)
    }

    /// Typed snapshot of the live tree.
    pub fn to_object<T: DeserializeOwned>(&self) -> Result<T> {
        mapper::from_tree(self.root.to_plain()?)
    }

    /// Edit the tree through a typed object. Counts as one change.
    pub fn update_object<T, F>(&self, update: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut object: T = self.to_object()?;
        update(&mut object);
        match mapper::to_tree(&object)? {
            Value::Object(map) => self.root.replace_all(map),
            other => Err(SettingsError::TypeMismatch {
                path: self.root.path().clone(),
                expected: "mapping",
                found: kind_name(&other),
            }),
        }
    }

    /// Run `f` with autosave deferred, then save exactly once.
    ///
    /// The save happens even if `f` fails; `f`'s error wins over a save error.
    pub fn batch<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&MappingView) -> std::result::Result<T, E>,
        E: From<SettingsError>,
    {
        let batch = self.begin_batch();
        let outcome = f(&batch.settings());
        let saved = batch.finish();
        let value = outcome?;
        saved?;
        Ok(value)
    }

    /// Defer autosave until the returned guard is finished or dropped.
    pub fn begin_batch(&self) -> Batch<'_> {
        let depth = self.shared.batch_depth.get() + 1;
        self.shared.batch_depth.set(depth);
        debug!(depth, "Batch started");
        Batch {
            session: self,
            finished: false,
        }
    }

    fn end_batch(&self) -> Result<()> {
        let depth = self.shared.batch_depth.get().saturating_sub(1);
        self.shared.batch_depth.set(depth);
        debug!(depth, "Batch finished");
        if depth == 0 {
            self.save()
        } else {
            Ok(())
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == SessionState::Dirty
    }

    /// Run the exit flush now and report its outcome. Dropping afterwards does nothing.
    pub fn shutdown(self) -> Result<()> {
        self.flushed.set(true);
        if self.shared.options.autosave_on_exit {
            info!("Saving settings on shutdown");
            self.save()
        } else {
            Ok(())
        }
    }

    pub fn read_path(&self) -> &Path {
        &self.shared.read_path
    }

    pub fn write_path(&self) -> &Path {
        &self.shared.write_path
    }

    pub fn format(&self) -> Format {
        self.shared.format
    }

    pub fn defaults(&self) -> &Value {
        &self.shared.defaults
    }

    pub fn options(&self) -> &SessionOptions {
        &self.shared.options
    }

    fn replace_root(&mut self, root: MappingView) {
        if let Err(e) = self.root.remove_callback(self.tracker) {
            debug!(error = %e, "Change handler already gone");
        }
        self.tracker = install_tracker(&self.shared, &root);
        self.root = root;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("read_path", &self.shared.read_path)
            .field("write_path", &self.shared.write_path)
            .field("format", &self.shared.format)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.flushed.get() || !self.shared.options.autosave_on_exit {
            return;
        }
        info!("Saving settings on exit");
        if let Err(e) = self.save() {
            error!(error = %e, "Failed to save settings on exit");
        }
    }
}

/// Register the session's change handler. It holds only weak handles, so the
/// registry never keeps the tree or the session alive.
fn install_tracker(shared: &Rc<Persistence>, root: &MappingView) -> CallbackId {
    let persistence: Weak<Persistence> = Rc::downgrade(shared);
    let tree: WeakMappingView = root.downgrade();
    root.add_callback(move || match (persistence.upgrade(), tree.upgrade()) {
        (Some(persistence), Some(root)) => persistence.changed(&root),
        _ => Ok(()),
    })
}

/// Deferred-save scope from [`Session::begin_batch`].
///
/// The outermost batch saves once when finished or dropped, including while
/// unwinding from a panic.
pub struct Batch<'a> {
    session: &'a Session,
    finished: bool,
}

impl Batch<'_> {
    pub fn settings(&self) -> MappingView {
        self.session.settings()
    }

    /// End the batch and report the save outcome.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.session.end_batch()
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.session.end_batch() {
            error!(error = %e, "Failed to save settings at end of batch");
        }
    }
}
