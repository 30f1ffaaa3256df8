//! Flag catalog: which commands and flags the CLI legitimately exposes.
//!
//! The catalog is built exactly once at startup from a [`CommandSpec`]
//! descriptor tree and is immutable afterward. It answers two questions for
//! the loader:
//!
//! - command-scoped: is `--namespace` legal for `chainctl install`, and what
//!   type does it carry?
//! - global: what type does `--namespace` carry when no command is in scope
//!   (the `defaults` and `profiles` sections of the document)?
//!
//! The global index is first-writer-wins: when two commands share a flag name
//! with different types, the type recorded is whichever the depth-first walk
//! saw first, and later collisions are silently ignored. That ambiguity is
//! deliberate and pinned by a test; see DESIGN.md.
//!
//! Nothing in this module names the CLI framework. The [`crate::bind`]
//! module adapts the live clap tree into a `CommandSpec` once at startup.

use std::collections::BTreeMap;

/// Primitive shape a flag value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagType {
    String,
    Bool,
    StringList,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::String => "string",
            FlagType::Bool => "boolean",
            FlagType::StringList => "string list",
        }
    }
}

impl std::fmt::Display for FlagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single flag a command exposes.
#[derive(Debug, Clone)]
pub struct FlagSpec {
    pub name: String,
    pub kind: FlagType,
}

impl FlagSpec {
    pub fn new(name: impl Into<String>, kind: FlagType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One node of the adapted command tree.
///
/// Hosts hand the catalog a fully materialized descriptor instead of the
/// framework's own command objects, so the framework is consulted exactly
/// once at startup and no runtime type inspection happens afterward.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub name: String,
    pub hidden: bool,
    pub flags: Vec<FlagSpec>,
    pub subcommands: Vec<CommandSpec>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            flags: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    /// Add a flag declared directly on this command.
    pub fn flag(mut self, name: impl Into<String>, kind: FlagType) -> Self {
        self.flags.push(FlagSpec::new(name, kind));
        self
    }

    /// Add a subcommand.
    pub fn subcommand(mut self, sub: CommandSpec) -> Self {
        self.subcommands.push(sub);
        self
    }

    /// Mark this command (and its whole subtree) as hidden.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// Read-only map of every visible command path to its legal flags, plus the
/// global any-command flag index used for un-scoped sections.
#[derive(Debug, Clone, Default)]
pub struct FlagCatalog {
    commands: BTreeMap<String, BTreeMap<String, FlagType>>,
    global: BTreeMap<String, FlagType>,
    paths: Vec<String>,
}

impl FlagCatalog {
    /// Walk the descriptor tree depth-first and build the catalog.
    ///
    /// Each command's path is the space-joined chain of names from the root
    /// (root included), and its flag set is its own flags plus every flag
    /// inherited from ancestors; an own declaration wins over an inherited
    /// one of the same name. Hidden commands and their subtrees are absent
    /// from [`commands`](Self::commands) and fail
    /// [`is_command_supported`](Self::is_command_supported), but their flags
    /// still feed the global index in traversal order.
    ///
    /// This step cannot fail on a well-formed tree.
    pub fn build(root: &CommandSpec) -> Self {
        let mut catalog = Self::default();
        catalog.visit(root, None, &BTreeMap::new(), false);
        catalog
    }

    fn visit(
        &mut self,
        node: &CommandSpec,
        parent_path: Option<&str>,
        inherited: &BTreeMap<String, FlagType>,
        hidden_ancestor: bool,
    ) {
        let path = match parent_path {
            Some(parent) => format!("{parent} {}", node.name),
            None => node.name.clone(),
        };

        let mut scoped = inherited.clone();
        for flag in &node.flags {
            self.global.entry(flag.name.clone()).or_insert(flag.kind);
            scoped.insert(flag.name.clone(), flag.kind);
        }

        let hidden = hidden_ancestor || node.hidden;
        if !hidden {
            self.paths.push(path.clone());
            self.commands.insert(path.clone(), scoped.clone());
        }

        for sub in &node.subcommands {
            self.visit(sub, Some(&path), &scoped, hidden);
        }
    }

    /// Visible command paths, in traversal order.
    pub fn commands(&self) -> &[String] {
        &self.paths
    }

    pub fn is_command_supported(&self, path: &str) -> bool {
        self.commands.contains_key(path)
    }

    /// Type of `flag` when scoped to `path`, including inherited flags.
    pub fn command_flag_type(&self, path: &str, flag: &str) -> Option<FlagType> {
        self.commands.get(path)?.get(flag).copied()
    }

    /// Type of `flag` with no command in scope (first traversal writer wins).
    pub fn global_flag_type(&self, flag: &str) -> Option<FlagType> {
        self.global.get(flag).copied()
    }
}
