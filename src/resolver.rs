//! Layered precedence merge: one [`ResolvedInvocation`] per command run.
//!
//! Layers apply in a fixed order, each one a full flag-set merge into the
//! accumulator:
//!
//! 1. the document's `defaults`
//! 2. each profile listed by the command section, in listed order
//! 3. the command section's own `flags`
//! 4. the flags the operator explicitly typed at invocation time
//!
//! Later layers strictly win, so the total order is
//! `default < profile < command < runtime` (and among profiles, last listed
//! wins). Every overwrite is recorded as an override note for the audit
//! trail. Resolution never partially applies: any error aborts before an
//! accumulator is returned.

use std::path::PathBuf;

use crate::schema::{ConfigurationProfile, FlagSet, SourcedValue, ValueSource};
use crate::{Error, Result};

/// The effective flag set for one command invocation, with provenance.
///
/// Newly allocated per resolution call and owned by the caller; nothing is
/// cached or reused across invocations.
#[derive(Debug, Clone)]
pub struct ResolvedInvocation {
    /// Space-joined command path, root included.
    pub command_path: String,
    /// Profile names the command section applied, in order.
    pub profiles: Vec<String>,
    /// Union of all layers; each value is from the highest-precedence layer
    /// that defined it.
    pub flags: FlagSet,
    /// Human-readable provenance notes, one per overwrite.
    pub overrides: Vec<String>,
    /// Non-fatal notes accumulated on the invocation's behalf (the binder
    /// appends here when a resolved flag is not recognised at apply time).
    pub warnings: Vec<String>,
    /// Path of the document that configured this invocation.
    pub source_path: PathBuf,
}

/// Resolve `command_path` against the loaded profile and the runtime flags
/// the operator explicitly supplied.
///
/// A command without a declarative section fails with
/// [`Error::CommandNotDeclared`]; callers that treat such commands as
/// simply "not configured" must check `profile.commands` first (the
/// [`crate::bind::pre_execution`] hook does). An empty `runtime` set is
/// legal and contributes nothing.
pub fn resolve(
    profile: &ConfigurationProfile,
    command_path: &str,
    runtime: FlagSet,
) -> Result<ResolvedInvocation> {
    let section = profile
        .commands
        .get(command_path)
        .ok_or_else(|| Error::CommandNotDeclared {
            path: command_path.to_string(),
        })?;
    if section.disabled {
        return Err(Error::CommandDisabled {
            path: command_path.to_string(),
        });
    }

    // Assemble the full ordered layer list before merging anything, so an
    // unresolvable profile reference aborts with nothing applied.
    let mut layers: Vec<(String, FlagSet)> = Vec::new();
    layers.push(("defaults".to_string(), profile.defaults.clone()));
    for name in &section.profiles {
        let flags = profile
            .profiles
            .get(name)
            .ok_or_else(|| Error::UnknownProfile {
                name: name.clone(),
                command: command_path.to_string(),
            })?;
        layers.push((format!("profile {name}"), flags.clone()));
    }
    layers.push(("command".to_string(), section.flags.clone()));
    layers.push(("runtime".to_string(), retag_runtime(runtime)));

    let mut flags = FlagSet::new();
    let mut overrides = Vec::new();
    for (label, layer) in layers {
        let (merged, notes) = apply_layer(flags, &label, layer);
        flags = merged;
        overrides.extend(notes);
    }

    Ok(ResolvedInvocation {
        command_path: command_path.to_string(),
        profiles: section.profiles.clone(),
        flags,
        overrides,
        warnings: Vec::new(),
        source_path: profile.source_path.clone(),
    })
}

/// Runtime entries always carry the runtime source, whatever the caller
/// tagged them with.
fn retag_runtime(runtime: FlagSet) -> FlagSet {
    runtime
        .into_iter()
        .map(|(name, sv)| (name, SourcedValue::new(sv.value, ValueSource::Runtime)))
        .collect()
}

/// Merge one named layer into the accumulator.
///
/// Pure with respect to its inputs: consumes the previous accumulator state
/// and returns the next one plus the override notes this layer produced.
/// Incoming values win unconditionally.
fn apply_layer(mut acc: FlagSet, label: &str, layer: FlagSet) -> (FlagSet, Vec<String>) {
    let mut notes = Vec::new();
    for (name, incoming) in layer {
        if let Some(previous) = acc.get(&name) {
            notes.push(format!(
                "`{label}` overrides `{name}` (was `{}`)",
                previous.source
            ));
        }
        acc.insert(name, incoming);
    }
    (acc, notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CommandSection, FlagValue, Metadata};
    use std::collections::BTreeMap;

    fn sv(value: FlagValue, source: ValueSource) -> SourcedValue {
        SourcedValue::new(value, source)
    }

    fn s(text: &str) -> FlagValue {
        FlagValue::Str(text.into())
    }

    /// Profile fixture with defaults, two named profiles, and an install
    /// section. Shapes match what the loader produces.
    fn fixture() -> ConfigurationProfile {
        let mut defaults = FlagSet::new();
        defaults.insert(
            "namespace".into(),
            sv(s("demo"), ValueSource::Default),
        );
        defaults.insert(
            "output".into(),
            sv(s("table"), ValueSource::Default),
        );

        let mut staging = FlagSet::new();
        staging.insert(
            "namespace".into(),
            sv(s("staging"), ValueSource::Profile),
        );
        let mut verbose = FlagSet::new();
        verbose.insert(
            "output".into(),
            sv(s("wide"), ValueSource::Profile),
        );
        let mut profiles = BTreeMap::new();
        profiles.insert("staging".to_string(), staging);
        profiles.insert("verbose".to_string(), verbose);

        let mut section_flags = FlagSet::new();
        section_flags.insert(
            "dry-run".into(),
            sv(FlagValue::Bool(true), ValueSource::Command),
        );
        let mut commands = BTreeMap::new();
        commands.insert(
            "chainctl install".to_string(),
            CommandSection {
                profiles: vec!["staging".into()],
                flags: section_flags,
                disabled: false,
            },
        );
        commands.insert(
            "chainctl upgrade".to_string(),
            CommandSection {
                disabled: true,
                ..Default::default()
            },
        );

        ConfigurationProfile {
            metadata: Metadata::default(),
            defaults,
            profiles,
            commands,
            source_path: "/etc/chainctl/chainctl.yaml".into(),
        }
    }

    #[test]
    fn layers_merge_in_precedence_order() {
        let mut runtime = FlagSet::new();
        runtime.insert(
            "namespace".into(),
            sv(s("runtime-ns"), ValueSource::Runtime),
        );

        let resolved = resolve(&fixture(), "chainctl install", runtime).expect("resolve");

        // runtime > profile > default for namespace.
        let namespace = &resolved.flags["namespace"];
        assert_eq!(namespace.value, s("runtime-ns"));
        assert_eq!(namespace.source, ValueSource::Runtime);

        // Untouched layers survive the merge.
        assert_eq!(resolved.flags["output"].source, ValueSource::Default);
        assert_eq!(resolved.flags["dry-run"].source, ValueSource::Command);
        assert_eq!(resolved.profiles, ["staging"]);
        assert_eq!(resolved.source_path.to_str(), Some("/etc/chainctl/chainctl.yaml"));
    }

    #[test]
    fn override_notes_record_every_transition() {
        let mut runtime = FlagSet::new();
        runtime.insert(
            "namespace".into(),
            sv(s("runtime-ns"), ValueSource::Runtime),
        );

        let resolved = resolve(&fixture(), "chainctl install", runtime).expect("resolve");
        assert_eq!(
            resolved.overrides,
            [
                "`profile staging` overrides `namespace` (was `default`)",
                "`runtime` overrides `namespace` (was `profile`)",
            ]
        );
    }

    #[test]
    fn last_listed_profile_wins() {
        let mut profile = fixture();
        // Both profiles set nothing in common, so also make verbose touch
        // namespace to exercise the ordering.
        profile
            .profiles
            .get_mut("verbose")
            .unwrap()
            .insert("namespace".into(), sv(s("wide-ns"), ValueSource::Profile));
        profile
            .commands
            .get_mut("chainctl install")
            .unwrap()
            .profiles = vec!["staging".into(), "verbose".into()];

        let resolved =
            resolve(&profile, "chainctl install", FlagSet::new()).expect("resolve");
        assert_eq!(resolved.flags["namespace"].value, s("wide-ns"));
        assert_eq!(
            resolved.overrides,
            [
                "`profile staging` overrides `namespace` (was `default`)",
                "`profile verbose` overrides `namespace` (was `profile`)",
                "`profile verbose` overrides `output` (was `default`)",
            ]
        );
    }

    #[test]
    fn undeclared_command_is_an_error() {
        let err = resolve(&fixture(), "chainctl bootstrap", FlagSet::new()).unwrap_err();
        assert!(matches!(err, Error::CommandNotDeclared { .. }));
    }

    #[test]
    fn disabled_command_short_circuits() {
        let err = resolve(&fixture(), "chainctl upgrade", FlagSet::new()).unwrap_err();
        assert!(matches!(err, Error::CommandDisabled { .. }));
    }

    #[test]
    fn unknown_profile_reference_aborts_resolution() {
        let mut profile = fixture();
        profile
            .commands
            .get_mut("chainctl install")
            .unwrap()
            .profiles = vec!["staging".into(), "missing".into()];

        let err = resolve(&profile, "chainctl install", FlagSet::new()).unwrap_err();
        match err {
            Error::UnknownProfile { name, command } => {
                assert_eq!(name, "missing");
                assert_eq!(command, "chainctl install");
            }
            other => panic!("expected UnknownProfile, got {other:?}"),
        }
    }

    #[test]
    fn runtime_entries_are_retagged() {
        // A sloppy caller tags a runtime value as `command`; provenance must
        // still read `runtime`.
        let mut runtime = FlagSet::new();
        runtime.insert("namespace".into(), sv(s("forced"), ValueSource::Command));

        let resolved = resolve(&fixture(), "chainctl install", runtime).expect("resolve");
        assert_eq!(resolved.flags["namespace"].source, ValueSource::Runtime);
    }

    #[test]
    fn empty_runtime_and_empty_section_flags_resolve() {
        let mut profile = fixture();
        profile
            .commands
            .get_mut("chainctl install")
            .unwrap()
            .flags = FlagSet::new();

        let resolved =
            resolve(&profile, "chainctl install", FlagSet::new()).expect("resolve");
        assert_eq!(resolved.flags["namespace"].value, s("staging"));
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn resolution_is_deterministic() {
        let mut runtime = FlagSet::new();
        runtime.insert("namespace".into(), sv(s("rt"), ValueSource::Runtime));
        runtime.insert(
            "dry-run".into(),
            sv(FlagValue::Bool(false), ValueSource::Runtime),
        );

        let profile = fixture();
        let first = resolve(&profile, "chainctl install", runtime.clone()).expect("first");
        let second = resolve(&profile, "chainctl install", runtime).expect("second");

        assert_eq!(first.flags, second.flags);
        assert_eq!(first.overrides, second.overrides);
        assert_eq!(first.warnings, second.warnings);
    }
}
