//! Binder glue between the engine and the CLI framework.
//!
//! This is the only module that names clap types. It adapts the live
//! command tree into the catalog descriptor once at startup, snapshots the
//! flags the operator explicitly typed, writes resolved values back through
//! the [`FlagSink`] the dispatcher implements, and ties the whole pipeline
//! together in [`pre_execution`].

use std::path::Path;

use clap::parser::ValueSource as ClapValueSource;
use clap::{ArgAction, ArgMatches, Command};

use crate::catalog::{CommandSpec, FlagCatalog, FlagType};
use crate::loader::load;
use crate::locate::locate;
use crate::resolver::{ResolvedInvocation, resolve};
use crate::schema::{FlagSet, FlagValue, SourcedValue, ValueSource};
use crate::{Error, Result};

/// Adapt a live clap command tree into the catalog descriptor.
///
/// Called once at startup; nothing downstream touches clap again. Boolean
/// actions map to [`FlagType::Bool`], appending actions to
/// [`FlagType::StringList`], everything else to [`FlagType::String`].
/// clap's built-in `help`/`version` arguments and the implicit `help`
/// subcommand are not part of the operator surface and are skipped.
pub fn command_spec(cmd: &Command) -> CommandSpec {
    let mut spec = CommandSpec::new(cmd.get_name());
    if cmd.is_hide_set() {
        spec = spec.hidden();
    }
    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_str();
        if id == "help" || id == "version" {
            continue;
        }
        spec = spec.flag(id, flag_kind(arg.get_action()));
    }
    for sub in cmd.get_subcommands() {
        if sub.get_name() == "help" {
            continue;
        }
        spec = spec.subcommand(command_spec(sub));
    }
    spec
}

fn flag_kind(action: &ArgAction) -> FlagType {
    match action {
        ArgAction::SetTrue | ArgAction::SetFalse => FlagType::Bool,
        ArgAction::Append => FlagType::StringList,
        _ => FlagType::String,
    }
}

/// Snapshot the flags the operator explicitly supplied on the command line.
///
/// `matches` is the root-level parse result; the walk follows the
/// subcommand chain so flags given at any level (root-global or leaf) are
/// captured. Only values whose clap source is the command line are taken -
/// defaults and env-sourced values stay out of the runtime layer. Every
/// entry is tagged [`ValueSource::Runtime`].
pub fn runtime_flags(
    matches: &ArgMatches,
    command_path: &str,
    catalog: &FlagCatalog,
) -> FlagSet {
    let mut set = FlagSet::new();
    let mut current = Some(matches);
    while let Some(level) = current {
        collect_level(level, command_path, catalog, &mut set);
        current = level.subcommand().map(|(_, sub)| sub);
    }
    set
}

fn collect_level(
    matches: &ArgMatches,
    command_path: &str,
    catalog: &FlagCatalog,
    set: &mut FlagSet,
) {
    for id in matches.ids() {
        let name = id.as_str();
        if matches.value_source(name) != Some(ClapValueSource::CommandLine) {
            continue;
        }
        let Some(kind) = catalog.command_flag_type(command_path, name) else {
            continue;
        };
        let value = match kind {
            FlagType::Bool => FlagValue::Bool(matches.get_flag(name)),
            FlagType::StringList => {
                let items = matches
                    .get_raw(name)
                    .map(|raw| raw.map(|v| v.to_string_lossy().into_owned()).collect())
                    .unwrap_or_default();
                FlagValue::List(items)
            }
            FlagType::String => {
                let Some(first) = matches
                    .get_raw(name)
                    .and_then(|mut raw| raw.next())
                else {
                    continue;
                };
                FlagValue::Str(first.to_string_lossy().into_owned())
            }
        };
        // Deeper levels overwrite shallower ones for the same name.
        set.insert(
            name.to_string(),
            SourcedValue::new(value, ValueSource::Runtime),
        );
    }
}

/// Where resolved values are written back. The command dispatcher implements
/// this over the live flag set of the command about to run.
pub trait FlagSink {
    /// Apply one flag by its string representation. Returns `false` when the
    /// command does not recognise the flag name.
    fn set_flag(&mut self, name: &str, value: &str) -> bool;
}

/// Write every resolved flag into the sink.
///
/// Values are serialized flat: booleans as `true`/`false`, lists
/// comma-joined. A name the sink rejects is not an error; it is returned as
/// a warning so the dispatcher can surface it.
pub fn apply(resolved: &ResolvedInvocation, sink: &mut dyn FlagSink) -> Vec<String> {
    let mut warnings = Vec::new();
    for (name, sv) in &resolved.flags {
        if !sink.set_flag(name, &sv.value.render()) {
            tracing::warn!(flag = %name, "resolved flag not recognised by command");
            warnings.push(format!("flag {name} ignored (not recognised by command)"));
        }
    }
    warnings
}

/// The pre-execution hook: locate, load, and resolve configuration for the
/// invoked command.
///
/// Returns `Ok(None)` when no configuration file exists anywhere on the
/// search path (the feature is simply off) or when the invoked command has
/// no declarative section. A missing explicitly-requested file, a document
/// that fails validation, a disabled command, or a dangling profile
/// reference all fail hard, before any side-effecting work begins.
pub fn pre_execution(
    root: &Command,
    matches: &ArgMatches,
    explicit: Option<&Path>,
) -> Result<Option<ResolvedInvocation>> {
    let located = match locate(explicit) {
        Ok(found) => found,
        Err(Error::ConfigNotFound { path: None }) => return Ok(None),
        Err(err) => return Err(err),
    };

    let catalog = FlagCatalog::build(&command_spec(root));
    let profile = load(&located.path, &catalog)?;

    let command_path = invoked_command_path(root.get_name(), matches);
    if !profile.commands.contains_key(&command_path) {
        return Ok(None);
    }

    let runtime = runtime_flags(matches, &command_path, &catalog);
    resolve(&profile, &command_path, runtime).map(Some)
}

/// Space-joined path of the invoked leaf command, root included.
pub fn invoked_command_path(root_name: &str, matches: &ArgMatches) -> String {
    let mut path = root_name.to_string();
    let mut current = matches;
    while let Some((name, sub)) = current.subcommand() {
        path.push(' ');
        path.push_str(name);
        current = sub;
    }
    path
}
