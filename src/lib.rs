//! Settings Store: persistent, format-agnostic application settings
//!
//! A settings tree backed by a JSON, YAML, TOML or INI file. Every mutation,
//! at any depth, is observed through a shared callback registry so the tree
//! can be saved automatically. The tree can be reconciled against a default
//! tree, and mapped to and from typed objects with serde.

pub mod cli;
pub mod codec;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod options;
pub mod sanitize;
pub mod session;
pub mod tracking;
pub mod tree;

pub use codec::{Format, FormatCodec};
pub use error::{ConfigurationError, Result, SettingsError};
pub use options::{OptionsLoader, SessionOptions};
pub use sanitize::{ReconciliationPlan, ShapeMismatchPolicy};
pub use session::{Batch, Session, SessionBuilder, SessionState};
pub use tracking::{CallbackId, Item, MappingView, NotificationGuard, SequenceView, SetView};
pub use tree::{KeyPath, Segment};
