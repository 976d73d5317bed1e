//! CLI parse: clap types for settings-store. No behavior; definitions only.

use crate::codec::Format;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// settings-store - inspect and edit settings files
#[derive(Parser, Debug)]
#[command(name = "settings-store")]
#[command(about = "Inspect, edit and reconcile JSON, YAML, TOML and INI settings files")]
pub struct Cli {
    /// Settings file (created from the defaults if missing)
    pub file: PathBuf,

    #[command(subcommand)]
    pub command: Commands,

    /// Default settings file; any supported format
    #[arg(long)]
    pub defaults: Option<PathBuf>,

    /// Format of the settings file (json, yaml, toml, ini); derived from the extension if omitted
    #[arg(long)]
    pub format: Option<Format>,

    /// Store options file (TOML)
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Print the whole settings tree
    Show,
    /// Print the value at a dotted path
    Get {
        /// Dotted path, e.g. `section.key`
        path: String,
    },
    /// Store a value at a dotted path. The value is parsed as JSON, or taken as a string
    Set {
        path: String,
        value: String,
    },
    /// Remove the value at a dotted path
    Unset {
        path: String,
    },
    /// Show what sanitizing against the defaults would change
    Diff,
    /// Reconcile the file with the defaults and save it
    Sanitize,
    /// Overwrite the file with the defaults
    Reset,
}
