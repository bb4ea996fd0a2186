//! Platform abstraction over the virtualization control plane.
//!
//! [`Hypervisor`] is the seam between the reclamation engine and whatever
//! speaks to libvirt. Production uses [`crate::platform::virsh::VirshHypervisor`];
//! tests substitute an in-memory fake.

#![allow(missing_docs)]

use std::fmt;

use serde::Serialize;

use crate::core::errors::Result;

/// Coarse domain state; only `Running` changes what the plan does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainState {
    Running,
    Stopped,
    Other,
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Other => "other",
        })
    }
}

/// A defined virtual machine. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub name: String,
    pub state: DomainState,
}

impl Domain {
    #[must_use]
    pub fn new(name: impl Into<String>, state: DomainState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

/// A storage volume. Identity is `(pool, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub name: String,
    pub pool: String,
}

impl Volume {
    #[must_use]
    pub fn new(pool: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pool: pool.into(),
        }
    }
}

/// Queries and destructive calls against one daemon endpoint.
///
/// Query failures from `list_domains` mean the endpoint is unusable; the
/// collector turns them into a fatal error. Mutating calls report per-call
/// success or failure and never abort the caller.
pub trait Hypervisor {
    /// Endpoint description for messages (e.g. the connection URI).
    fn endpoint(&self) -> &str;
    fn list_domains(&self) -> Result<Vec<Domain>>;
    fn pool_exists(&self, pool: &str) -> Result<bool>;
    fn list_volumes(&self, pool: &str) -> Result<Vec<Volume>>;
    fn destroy_domain(&self, name: &str) -> Result<()>;
    fn undefine_domain(&self, name: &str) -> Result<()>;
    fn delete_volume(&self, pool: &str, name: &str) -> Result<()>;
}
