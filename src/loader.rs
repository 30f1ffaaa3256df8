//! Strict loader: the YAML document becomes a validated
//! [`ConfigurationProfile`] or an error, never something in between.
//!
//! Processing order: `defaults` (global catalog lookup), then `profiles`
//! (also global - no command is in scope yet), then `commands`
//! (command-scoped lookup, stricter). The first unknown flag, unknown
//! command, type mismatch, or sensitive flag name aborts the whole load.

use std::fs;
use std::path::Path;

use crate::catalog::{FlagCatalog, FlagType};
use crate::schema::{
    CommandSection, ConfigurationProfile, FlagSet, FlagValue, RawDocument, RawFlagMap,
    SourcedValue, ValueSource, is_sensitive_flag,
};
use crate::{Error, Result};

/// Parse and validate the configuration document at `path`.
pub fn load(path: &Path, catalog: &FlagCatalog) -> Result<ConfigurationProfile> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawDocument = serde_yaml::from_str(&text).map_err(|source| Error::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let defaults = coerce_section(
        &raw.defaults,
        "the defaults section",
        Scope::Global,
        ValueSource::Default,
        catalog,
    )?;

    let mut profiles = std::collections::BTreeMap::new();
    for (name, raw_flags) in &raw.profiles {
        let flags = coerce_section(
            raw_flags,
            &format!("profile {name:?}"),
            Scope::Global,
            ValueSource::Profile,
            catalog,
        )?;
        profiles.insert(name.clone(), flags);
    }

    let mut commands = std::collections::BTreeMap::new();
    for (command_path, section) in &raw.commands {
        if !catalog.is_command_supported(command_path) {
            return Err(Error::UnknownCommand {
                path: command_path.clone(),
                known: catalog.commands().to_vec(),
            });
        }
        let flags = coerce_section(
            &section.flags,
            &format!("the {command_path:?} command section"),
            Scope::Command(command_path),
            ValueSource::Command,
            catalog,
        )?;
        commands.insert(
            command_path.clone(),
            CommandSection {
                profiles: section.profiles.clone(),
                flags,
                disabled: section.disabled,
            },
        );
    }

    tracing::debug!(
        path = %path.display(),
        commands = commands.len(),
        profiles = profiles.len(),
        "configuration loaded"
    );

    Ok(ConfigurationProfile {
        metadata: raw.metadata,
        defaults,
        profiles,
        commands,
        source_path: path.to_path_buf(),
    })
}

/// Flag lookup scope: the global any-command index for `defaults` and
/// `profiles`, or a specific command's legal flag set.
enum Scope<'a> {
    Global,
    Command(&'a str),
}

fn coerce_section(
    raw: &RawFlagMap,
    section: &str,
    scope: Scope<'_>,
    source: ValueSource,
    catalog: &FlagCatalog,
) -> Result<FlagSet> {
    let mut flags = FlagSet::new();
    for (name, value) in raw {
        // Security check runs before any type lookup.
        if is_sensitive_flag(name) {
            return Err(Error::SecretsDisallowed {
                flag: name.clone(),
                section: section.to_string(),
            });
        }
        let kind = match scope {
            Scope::Global => catalog.global_flag_type(name),
            Scope::Command(path) => catalog.command_flag_type(path, name),
        }
        .ok_or_else(|| Error::UnknownFlag {
            flag: name.clone(),
            command: match scope {
                Scope::Global => None,
                Scope::Command(path) => Some(path.to_string()),
            },
        })?;
        let value = coerce_value(name, value, kind)?;
        flags.insert(name.clone(), SourcedValue::new(value, source));
    }
    Ok(flags)
}

/// Coerce one loosely-typed YAML scalar into the declared flag type.
fn coerce_value(name: &str, raw: &serde_yaml::Value, kind: FlagType) -> Result<FlagValue> {
    use serde_yaml::Value;

    match kind {
        FlagType::Bool => match raw {
            Value::Bool(b) => Ok(FlagValue::Bool(*b)),
            Value::String(s) => match parse_bool(s) {
                Some(b) => Ok(FlagValue::Bool(b)),
                None => Err(type_error(name, kind, raw)),
            },
            _ => Err(type_error(name, kind, raw)),
        },
        FlagType::StringList => match raw {
            Value::Sequence(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(scalar_string(item).ok_or_else(|| type_error(name, kind, item))?);
                }
                Ok(FlagValue::List(list))
            }
            // A bare string is a one-element list.
            Value::String(s) => Ok(FlagValue::List(vec![s.clone()])),
            _ => Err(type_error(name, kind, raw)),
        },
        FlagType::String => scalar_string(raw)
            .map(FlagValue::Str)
            .ok_or_else(|| type_error(name, kind, raw)),
    }
}

/// Stringify a scalar: strings pass through, booleans and numbers are
/// formatted. Sequences, mappings, and null do not stringify.
fn scalar_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepted boolean spellings, case-insensitive.
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn type_error(name: &str, kind: FlagType, raw: &serde_yaml::Value) -> Error {
    Error::InvalidFlagType {
        flag: name.to_string(),
        expected: kind,
        found: found_shape(raw).to_string(),
    }
}

fn found_shape(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
