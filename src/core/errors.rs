//! VRC-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, VrcError>;

/// Top-level error type for virt-reclaim.
#[derive(Debug, Error)]
pub enum VrcError {
    #[error("[VRC-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[VRC-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[VRC-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[VRC-2001] required tool not found: {tool}")]
    ToolMissing { tool: String },

    #[error("[VRC-2002] another instance is running (lock held: {path})")]
    LockContention { path: PathBuf },

    #[error("[VRC-2003] no {marker} in {dir}; refusing project-scoped cleanup")]
    MissingProjectContext { dir: PathBuf, marker: String },

    #[error("[VRC-2004] cannot derive a project prefix from {dir}")]
    EmptyPrefix { dir: PathBuf },

    #[error("[VRC-2005] virtualization daemon unreachable at {uri}: {details}")]
    DaemonUnreachable { uri: String, details: String },

    #[error("[VRC-3001] virsh {command} failed for {target}: {details}")]
    ActionFailed {
        command: &'static str,
        target: String,
        details: String,
    },

    #[error("[VRC-3002] virsh {command} timed out after {secs}s for {target}")]
    ActionTimedOut {
        command: &'static str,
        target: String,
        secs: u64,
    },

    #[error("[VRC-3003] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[VRC-3101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[VRC-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl VrcError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "VRC-1001",
            Self::MissingConfig { .. } => "VRC-1002",
            Self::ConfigParse { .. } => "VRC-1003",
            Self::ToolMissing { .. } => "VRC-2001",
            Self::LockContention { .. } => "VRC-2002",
            Self::MissingProjectContext { .. } => "VRC-2003",
            Self::EmptyPrefix { .. } => "VRC-2004",
            Self::DaemonUnreachable { .. } => "VRC-2005",
            Self::ActionFailed { .. } => "VRC-3001",
            Self::ActionTimedOut { .. } => "VRC-3002",
            Self::Io { .. } => "VRC-3003",
            Self::Serialization { .. } => "VRC-3101",
            Self::Runtime { .. } => "VRC-3900",
        }
    }

    /// Whether the error must abort the run before any mutation.
    #[must_use]
    pub const fn is_fatal_precondition(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::ToolMissing { .. }
                | Self::LockContention { .. }
                | Self::MissingProjectContext { .. }
                | Self::EmptyPrefix { .. }
                | Self::DaemonUnreachable { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for VrcError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for VrcError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
