//! Configuration: defaults, optional TOML file, environment overrides.
//!
//! Everything is resolved once into a [`Config`] and then frozen into a
//! [`RunConfig`] that is handed explicitly to every component. Nothing reads
//! the environment after startup.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, VrcError};

/// Default libvirt connection URI.
pub const DEFAULT_URI: &str = "qemu:///system";
/// Default storage pool.
pub const DEFAULT_POOL: &str = "default";
/// Lock file name used when no explicit lock path is configured.
pub const LOCK_FILE_NAME: &str = "virt-reclaim.lock";

/// Full configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub virsh: VirshConfig,
    pub scope: ScopeConfig,
    pub lock: LockConfig,
    pub logging: LoggingConfig,
    pub orchestrator: OrchestratorConfig,
}

/// How to reach the virtualization daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirshConfig {
    pub binary: String,
    pub uri: String,
    /// Upper bound for a single mutating call; 0 disables the bound.
    pub action_timeout_secs: u64,
}

impl Default for VirshConfig {
    fn default() -> Self {
        Self {
            binary: "virsh".to_string(),
            uri: DEFAULT_URI.to_string(),
            action_timeout_secs: 0,
        }
    }
}

/// Scope resolution inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Whole-name globs for volumes that global mode never deletes.
    pub protect_globs: Vec<String>,
    /// Case-insensitive suffixes for volumes that global mode never deletes.
    pub protect_suffixes: Vec<String>,
    /// File whose presence marks the working directory as a project.
    pub project_marker: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            protect_globs: vec!["*_vagrant_box_image_*".to_string()],
            protect_suffixes: vec![".iso".to_string()],
            project_marker: "Vagrantfile".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append-only JSONL record of every action outcome.
    pub activity_log: Option<PathBuf>,
}

/// The orchestration tool whose own teardown is attempted first in project mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub enabled: bool,
    pub binary: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: "vagrant".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file (if any), then the
    /// process environment. An explicitly named file that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Self::load`] with an injectable environment lookup. Empty variables
    /// count as unset.
    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env_path = lookup("VRC_CONFIG")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VrcError::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| VrcError::io(path, e))?;
        Ok(toml::from_str(&raw)?)
    }

    /// Apply `VRC_*` overrides through an injectable lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(binary) = lookup("VRC_VIRSH").filter(|v| !v.is_empty()) {
            self.virsh.binary = binary;
        }
        if let Some(binary) = lookup("VRC_VAGRANT").filter(|v| !v.is_empty()) {
            self.orchestrator.binary = binary;
        }
        if let Some(path) = lookup("VRC_LOCK_PATH").filter(|v| !v.is_empty()) {
            self.lock.path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("VRC_ACTIVITY_LOG").filter(|v| !v.is_empty()) {
            self.logging.activity_log = Some(PathBuf::from(path));
        }
        if self.lock.path.is_none() {
            let tmp = lookup("TMPDIR").filter(|v| !v.is_empty());
            self.lock.path = Some(default_lock_path(tmp.as_deref()));
        }
    }

    /// Reject configurations that would make scoping meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.virsh.binary.trim().is_empty() {
            return Err(invalid("virsh.binary must not be empty"));
        }
        if self.virsh.uri.trim().is_empty() {
            return Err(invalid("virsh.uri must not be empty"));
        }
        if self.scope.project_marker.trim().is_empty() {
            return Err(invalid("scope.project_marker must not be empty"));
        }
        if self.scope.protect_globs.iter().any(|g| g.trim().is_empty()) {
            return Err(invalid("scope.protect_globs contains an empty pattern"));
        }
        if self.scope.protect_suffixes.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("scope.protect_suffixes contains an empty suffix"));
        }
        Ok(())
    }

    /// Lock path after overrides, falling back to the temp-dir default.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.lock
            .path
            .clone()
            .unwrap_or_else(|| default_lock_path(None))
    }
}

fn invalid(details: &str) -> VrcError {
    VrcError::InvalidConfig {
        details: details.to_string(),
    }
}

/// `$TMPDIR/virt-reclaim.lock`, or `/tmp/virt-reclaim.lock`.
#[must_use]
pub fn default_lock_path(tmpdir: Option<&str>) -> PathBuf {
    Path::new(tmpdir.unwrap_or("/tmp")).join(LOCK_FILE_NAME)
}

/// Whether the run mutates the daemon or only reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Simulate,
    Execute,
}

impl ExecutionMode {
    #[must_use]
    pub const fn from_force(force: bool) -> Self {
        if force { Self::Execute } else { Self::Simulate }
    }

    #[must_use]
    pub const fn is_dry_run(self) -> bool {
        matches!(self, Self::Simulate)
    }
}

/// How the run talks to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub color: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            quiet: false,
            json: false,
            color: true,
        }
    }
}

/// Immutable per-run settings, constructed once from CLI input and [`Config`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub config: Config,
    pub mode: ExecutionMode,
    pub pool: String,
    pub uri: String,
    pub output: OutputOptions,
}

impl RunConfig {
    /// `uri` overrides the configured endpoint when given.
    #[must_use]
    pub fn new(
        config: Config,
        mode: ExecutionMode,
        pool: &str,
        uri: Option<&str>,
        output: OutputOptions,
    ) -> Self {
        let uri = uri.map_or_else(|| config.virsh.uri.clone(), str::to_string);
        Self {
            config,
            mode,
            pool: pool.to_string(),
            uri,
            output,
        }
    }
}
