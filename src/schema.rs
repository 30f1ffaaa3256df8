//! Value model and document schema for `chainctl.yaml`.
//!
//! Two layers live here:
//!
//! - the **raw** serde types ([`RawDocument`], [`RawCommandSection`]) that
//!   mirror the file exactly, with `deny_unknown_fields` providing strict
//!   key checking, and
//! - the **validated** types ([`ConfigurationProfile`], [`CommandSection`],
//!   [`FlagSet`]) the loader produces once every flag has been checked
//!   against the catalog and coerced to its declared type.
//!
//! Dynamic typing stops at the loader boundary: past it, every value is a
//! [`FlagValue`] over exactly the three supported shapes.
//!
//! ## Security
//!
//! Declarative configuration must never carry credentials. Any flag whose
//! name matches [`is_sensitive_flag`] is rejected at load time no matter
//! which section it appears in; tokens and the like belong to the token
//! subsystem, not this file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a resolved flag value came from.
///
/// Provenance, not priority: precedence is positional in the resolver's
/// layer order, `default < profile < command < runtime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// The document's top-level `defaults` section
    Default,
    /// A named profile referenced by the command section
    Profile,
    /// The command section's own `flags`
    Command,
    /// Explicitly typed on the command line
    Runtime,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSource::Default => "default",
            ValueSource::Profile => "profile",
            ValueSource::Command => "command",
            ValueSource::Runtime => "runtime",
        }
    }
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed flag payload: the tagged union over the three legal shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Str(String),
    Bool(bool),
    List(Vec<String>),
}

impl FlagValue {
    /// Flat string rendering: booleans as `true`/`false`, lists comma-joined.
    /// Used by the text summary and by the flag application sink.
    pub fn render(&self) -> String {
        match self {
            FlagValue::Str(s) => s.clone(),
            FlagValue::Bool(b) => b.to_string(),
            FlagValue::List(items) => items.join(","),
        }
    }

    /// Structured JSON rendering: lists stay native arrays.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FlagValue::Str(s) => serde_json::Value::from(s.as_str()),
            FlagValue::Bool(b) => serde_json::Value::from(*b),
            FlagValue::List(items) => serde_json::Value::from(items.clone()),
        }
    }
}

/// A flag value plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedValue {
    pub value: FlagValue,
    pub source: ValueSource,
}

impl SourcedValue {
    pub fn new(value: FlagValue, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Flag name to provenance-tagged value. Keys are unique; the sorted map
/// keeps display and merge order deterministic.
pub type FlagSet = BTreeMap<String, SourcedValue>;

/// Validated per-command section of the document.
#[derive(Debug, Clone, Default)]
pub struct CommandSection {
    /// Profile names to apply, in listed order. Existence is validated at
    /// resolve time, not load time.
    pub profiles: Vec<String>,
    pub flags: FlagSet,
    /// Disabled sections short-circuit resolution with an error.
    pub disabled: bool,
}

/// Free-form document identification.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// The parsed, validated configuration document.
///
/// Created once per process invocation by [`crate::loader::load`] and
/// immutable afterward; the resolver only reads it, so sharing one profile
/// across concurrent resolutions needs no synchronization.
#[derive(Debug, Clone)]
pub struct ConfigurationProfile {
    pub metadata: Metadata,
    pub defaults: FlagSet,
    pub profiles: BTreeMap<String, FlagSet>,
    pub commands: BTreeMap<String, CommandSection>,
    /// Absolute path the document was loaded from.
    pub source_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Raw (pre-validation) document
// ---------------------------------------------------------------------------

/// Loosely-typed flag map as it appears in the file.
pub(crate) type RawFlagMap = BTreeMap<String, serde_yaml::Value>;

/// Top-level shape of `chainctl.yaml`. Exactly four optional keys; anything
/// else is a parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawDocument {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub defaults: RawFlagMap,
    #[serde(default)]
    pub profiles: BTreeMap<String, RawFlagMap>,
    #[serde(default)]
    pub commands: BTreeMap<String, RawCommandSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawCommandSection {
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub flags: RawFlagMap,
    #[serde(default)]
    pub disabled: bool,
}

/// Case-insensitive substrings that classify a flag name as sensitive.
pub const SENSITIVE_FLAG_MARKERS: [&str; 5] =
    ["token", "secret", "passphrase", "password", "kubeconfig"];

/// True when the flag name may carry a credential and must be rejected.
pub fn is_sensitive_flag(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    SENSITIVE_FLAG_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_source_display() {
        assert_eq!(format!("{}", ValueSource::Default), "default");
        assert_eq!(format!("{}", ValueSource::Profile), "profile");
        assert_eq!(format!("{}", ValueSource::Command), "command");
        assert_eq!(format!("{}", ValueSource::Runtime), "runtime");
    }

    #[test]
    fn render_flattens_every_shape() {
        assert_eq!(FlagValue::Str("demo".into()).render(), "demo");
        assert_eq!(FlagValue::Bool(false).render(), "false");
        assert_eq!(
            FlagValue::List(vec!["a".into(), "b".into()]).render(),
            "a,b"
        );
    }

    #[test]
    fn json_rendering_keeps_lists_structured() {
        let value = FlagValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(value.to_json(), serde_json::json!(["a", "b"]));
        assert_eq!(FlagValue::Bool(true).to_json(), serde_json::json!(true));
    }

    #[test]
    fn sensitive_markers_match_case_insensitively_anywhere() {
        assert!(is_sensitive_flag("values-passphrase"));
        assert!(is_sensitive_flag("GITHUB_TOKEN"));
        assert!(is_sensitive_flag("Password"));
        assert!(is_sensitive_flag("kubeconfig"));
        assert!(is_sensitive_flag("app-secret-name"));
        assert!(!is_sensitive_flag("namespace"));
        assert!(!is_sensitive_flag("dry-run"));
    }

    #[test]
    fn raw_document_rejects_unknown_top_level_key() {
        let err = serde_yaml::from_str::<RawDocument>("defaults: {}\nextras: {}\n");
        assert!(err.is_err());
    }

    #[test]
    fn raw_command_section_rejects_unknown_key() {
        let err =
            serde_yaml::from_str::<RawCommandSection>("flags: {}\nenv: {}\n");
        assert!(err.is_err());
    }
}
