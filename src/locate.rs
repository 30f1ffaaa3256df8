//! Discovery of the single `chainctl.yaml` configuration file.
//!
//! Search order, first hit wins:
//!
//! 1. Explicit path passed by the caller (hard error if missing)
//! 2. `$CHAINCTL_CONFIG` (hard error if missing)
//! 3. `./chainctl.yaml` in the working directory
//! 4. `$XDG_CONFIG_HOME/chainctl/chainctl.yaml`
//! 5. `~/.config/chainctl/chainctl.yaml`
//!
//! Tiers 3-5 soft-skip when the file is absent; a candidate that resolves to
//! a directory counts as absent. Candidate paths are cleaned, `~`-expanded,
//! and absolutized before any filesystem check.

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Fixed configuration file name on every search tier.
pub const CONFIG_FILE_NAME: &str = "chainctl.yaml";

/// Environment variable naming an explicit configuration path (tier 2).
pub const CONFIG_PATH_ENV: &str = "CHAINCTL_CONFIG";

/// Environment variable naming the XDG-style config root (tier 4).
pub const XDG_CONFIG_HOME_ENV: &str = "XDG_CONFIG_HOME";

/// Application subdirectory under the config root.
pub const CONFIG_DIR_NAME: &str = "chainctl";

/// Which search tier produced the configuration path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicit path argument
    Explicit,
    /// `$CHAINCTL_CONFIG`
    EnvVar,
    /// Working directory
    WorkingDir,
    /// `$XDG_CONFIG_HOME/chainctl/`
    XdgConfig,
    /// `~/.config/chainctl/`
    HomeDir,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Explicit => "flag",
            ConfigSource::EnvVar => "env",
            ConfigSource::WorkingDir => "working-dir",
            ConfigSource::XdgConfig => "xdg-config",
            ConfigSource::HomeDir => "home",
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discovered configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    pub source: ConfigSource,
}

/// Snapshot of the process environment the locator consults.
///
/// Production code goes through [`locate`], which captures the live
/// environment once; tests construct an `Environment` directly and call
/// [`locate_in`], so no test ever mutates process-global env vars.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub cwd: PathBuf,
    pub home: Option<PathBuf>,
    /// Value of [`CONFIG_PATH_ENV`], if set and non-empty.
    pub config_path: Option<String>,
    /// Value of [`XDG_CONFIG_HOME_ENV`], if set and non-empty.
    pub xdg_config_home: Option<String>,
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            cwd: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            home: dirs::home_dir(),
            config_path: env::var(CONFIG_PATH_ENV).ok().filter(|v| !v.is_empty()),
            xdg_config_home: env::var(XDG_CONFIG_HOME_ENV)
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }
}

/// Find the configuration file, following the fixed search order.
///
/// Returns [`Error::ConfigNotFound`] carrying the candidate path when an
/// explicitly requested file (tier 1 or 2) is missing, and carrying no path
/// when the whole search came up empty.
pub fn locate(explicit: Option<&Path>) -> Result<Located> {
    locate_in(&Environment::capture(), explicit)
}

/// [`locate`] with an injected environment snapshot.
pub fn locate_in(env: &Environment, explicit: Option<&Path>) -> Result<Located> {
    // Tier 1: explicit path argument. Missing file is a hard error, not a
    // fallthrough.
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        let candidate = absolutize(env, path);
        if is_file(&candidate) {
            return Ok(Located {
                path: candidate,
                source: ConfigSource::Explicit,
            });
        }
        return Err(Error::ConfigNotFound {
            path: Some(candidate),
        });
    }

    // Tier 2: $CHAINCTL_CONFIG, same hard-error semantics.
    if let Some(raw) = &env.config_path {
        let candidate = absolutize(env, Path::new(raw));
        if is_file(&candidate) {
            return Ok(Located {
                path: candidate,
                source: ConfigSource::EnvVar,
            });
        }
        return Err(Error::ConfigNotFound {
            path: Some(candidate),
        });
    }

    // Tier 3: working directory.
    let candidate = clean(&env.cwd.join(CONFIG_FILE_NAME));
    if is_file(&candidate) {
        tracing::debug!(path = %candidate.display(), "configuration found in working directory");
        return Ok(Located {
            path: candidate,
            source: ConfigSource::WorkingDir,
        });
    }

    // Tier 4: XDG config root, skipped entirely when the variable is unset.
    if let Some(root) = &env.xdg_config_home {
        let candidate = absolutize(
            env,
            &Path::new(root).join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
        );
        if is_file(&candidate) {
            return Ok(Located {
                path: candidate,
                source: ConfigSource::XdgConfig,
            });
        }
    }

    // Tier 5: per-user fallback under the home directory.
    if let Some(home) = &env.home {
        let candidate = clean(
            &home
                .join(".config")
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
        if is_file(&candidate) {
            return Ok(Located {
                path: candidate,
                source: ConfigSource::HomeDir,
            });
        }
    }

    tracing::debug!("no configuration file on any search tier");
    Err(Error::ConfigNotFound { path: None })
}

/// Regular files only: a directory at a candidate path counts as absent.
fn is_file(path: &Path) -> bool {
    path.is_file()
}

fn absolutize(env: &Environment, path: &Path) -> PathBuf {
    let expanded = expand_tilde(env, path);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        env.cwd.join(expanded)
    };
    clean(&joined)
}

/// Expand a leading `~` component against the home directory. `~user` forms
/// are left untouched.
fn expand_tilde(env: &Environment, path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = &env.home {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Lexically drop `.` components and resolve `..` against the parent.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            _ => out.push(part.as_os_str()),
        }
    }
    out
}
