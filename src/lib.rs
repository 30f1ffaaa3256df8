//! Declarative flag configuration resolution for the `chainctl` operator CLI.
//!
//! Operators describe desired flag values once in a `chainctl.yaml` document
//! (shared defaults, reusable named profiles, per-command overrides) and this
//! library deterministically merges them with the flags actually typed at
//! invocation time, producing one effective, fully-typed, provenance-tagged
//! flag set per command.
//!
//! The pipeline, leaf to root:
//!
//! - [`catalog`] - which commands and flags legitimately exist
//! - [`locate`] - where the single configuration file lives
//! - [`loader`] - strict parse of the YAML document into a [`schema::ConfigurationProfile`]
//! - [`resolver`] - layered merge into a [`resolver::ResolvedInvocation`]
//! - [`summary`] - text and JSON renderings for display and telemetry
//! - [`bind`] - glue to the clap command tree (the only module that talks to
//!   the CLI framework)
//!
//! Precedence, lowest to highest: `default < profile < command < runtime`.
//! Every overwrite is recorded as a human-readable override note.
//!
//! This crate is a library consumed by the CLI's pre-execution hook; it has
//! no flags of its own, never executes commands, and resolves configuration
//! exactly once per invocation.

pub mod bind;
pub mod catalog;
pub mod loader;
pub mod locate;
pub mod resolver;
pub mod schema;
pub mod summary;

pub use catalog::{CommandSpec, FlagCatalog, FlagSpec, FlagType};
pub use loader::load;
pub use locate::{ConfigSource, Environment, Located, locate};
pub use resolver::{ResolvedInvocation, resolve};
pub use schema::{ConfigurationProfile, FlagSet, FlagValue, SourcedValue, ValueSource};
pub use summary::SummaryFormat;

use std::path::PathBuf;

/// Library-level error type for configuration resolution.
///
/// Every variant is terminal and non-retryable: a configuration problem must
/// halt the affected command before any side-effecting work begins. Variants
/// carry enough context (file path, command path, flag name) for the operator
/// to fix the document without re-running with verbose flags.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No configuration file exists. The path is set when an explicitly
    /// requested file (flag or environment variable) is missing, which is a
    /// hard error; it is `None` when the whole search path came up empty,
    /// which callers treat as "feature disabled".
    #[error("configuration file not found{}", .path.as_ref().map(|p| format!(": {}", p.display())).unwrap_or_default())]
    ConfigNotFound { path: Option<PathBuf> },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML, including unknown top-level or section keys.
    #[error("invalid configuration in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown command {path:?} in configuration (known commands: {})", .known.join(", "))]
    UnknownCommand { path: String, known: Vec<String> },

    #[error("unknown flag {flag:?}{}", .command.as_ref().map(|c| format!(" for command {c:?}")).unwrap_or_default())]
    UnknownFlag {
        flag: String,
        command: Option<String>,
    },

    #[error("flag {flag:?} expects a {expected} value, got {found}")]
    InvalidFlagType {
        flag: String,
        expected: FlagType,
        found: String,
    },

    #[error("sensitive flag {flag:?} in {section}: credentials are not allowed in configuration files")]
    SecretsDisallowed { flag: String, section: String },

    #[error("command {path:?} is not declared in the configuration")]
    CommandNotDeclared { path: String },

    #[error("command {path:?} is disabled by the configuration")]
    CommandDisabled { path: String },

    #[error("unknown profile {name:?} referenced by command {command:?}")]
    UnknownProfile { name: String, command: String },

    #[error("unsupported summary format {format:?} (expected \"text\" or \"json\")")]
    UnsupportedFormat { format: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for configuration resolution.
pub type Result<T> = std::result::Result<T, Error>;
