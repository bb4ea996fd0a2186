//! Project context for prefix-scoped runs.
//!
//! A project is a directory carrying the configured marker file (normally a
//! `Vagrantfile`). Its directory name yields the [`ProjectPrefix`].

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::config::OrchestratorConfig;
use crate::core::errors::{Result, VrcError};
use crate::reclaim::scope::ProjectPrefix;

/// A directory verified to be a project, with its derived prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub dir: PathBuf,
    pub marker: PathBuf,
    pub prefix: ProjectPrefix,
}

impl ProjectContext {
    /// Verify `dir` holds `marker` and derive the prefix from its name.
    ///
    /// Both failures are fatal preconditions: running project-scoped cleanup
    /// from the wrong directory must never proceed.
    pub fn detect(dir: &Path, marker: &str) -> Result<Self> {
        let marker_path = dir.join(marker);
        if !marker_path.is_file() {
            return Err(VrcError::MissingProjectContext {
                dir: dir.to_path_buf(),
                marker: marker.to_string(),
            });
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix = ProjectPrefix::from_dir_name(&name).ok_or_else(|| VrcError::EmptyPrefix {
            dir: dir.to_path_buf(),
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            marker: marker_path,
            prefix,
        })
    }
}

/// Result of the best-effort orchestrator teardown. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownOutcome {
    Disabled,
    /// Dry run: would have run this command line.
    Planned(String),
    Completed,
    /// Non-zero exit, missing binary, or spawn failure; swallowed.
    Ignored(String),
}

/// Run `<vagrant> destroy -f` in the project directory, swallowing every failure.
#[must_use]
pub fn orchestrator_teardown(
    config: &OrchestratorConfig,
    project: &ProjectContext,
    dry_run: bool,
) -> TeardownOutcome {
    if !config.enabled {
        return TeardownOutcome::Disabled;
    }
    let command_line = format!("{} destroy -f", config.binary);
    if dry_run {
        return TeardownOutcome::Planned(command_line);
    }
    match Command::new(&config.binary)
        .args(["destroy", "-f"])
        .current_dir(&project.dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
    {
        Ok(output) if output.status.success() => TeardownOutcome::Completed,
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first = stderr.lines().next().unwrap_or("").trim();
            TeardownOutcome::Ignored(format!("{command_line} exited with {}: {first}", output.status))
        }
        Err(e) => TeardownOutcome::Ignored(format!("{command_line}: {e}")),
    }
}
