//! Inventory collection: one snapshot of domains and pool volumes per run.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::errors::{Result, VrcError};
use crate::platform::pal::{Domain, Hypervisor, Volume};

/// Whether the target pool could be enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PoolStatus {
    Present,
    /// Pool does not exist; volumes are skipped, domains still processed.
    Missing,
    /// Pool exists but could not be listed (e.g. inactive); volumes are skipped.
    Unreadable { details: String },
}

/// Volumes in one pool plus the soft-skip signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeListing {
    pub volumes: Vec<Volume>,
    pub status: PoolStatus,
}

/// A single consistent snapshot taken before planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub endpoint: String,
    pub pool: String,
    pub pool_status: PoolStatus,
    pub domains: Vec<Domain>,
    pub volumes: Vec<Volume>,
}

impl Inventory {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.volumes.is_empty()
    }
}

/// Gathers the inventory from a [`Hypervisor`].
pub struct InventoryCollector<'a> {
    hypervisor: &'a dyn Hypervisor,
}

impl<'a> InventoryCollector<'a> {
    #[must_use]
    pub fn new(hypervisor: &'a dyn Hypervisor) -> Self {
        Self { hypervisor }
    }

    /// All defined domains. Any failure here is fatal: an inventory we cannot
    /// trust must never reach the planner.
    pub fn list_domains(&self) -> Result<Vec<Domain>> {
        self.hypervisor
            .list_domains()
            .map_err(|err| match err {
                VrcError::DaemonUnreachable { .. } | VrcError::ToolMissing { .. } => err,
                other => VrcError::DaemonUnreachable {
                    uri: self.hypervisor.endpoint().to_string(),
                    details: other.to_string(),
                },
            })
    }

    pub fn pool_exists(&self, pool: &str) -> Result<bool> {
        self.hypervisor.pool_exists(pool)
    }

    /// Volumes in `pool`, or an empty listing with a soft-skip status.
    pub fn list_volumes(&self, pool: &str) -> Result<VolumeListing> {
        if !self.pool_exists(pool)? {
            return Ok(VolumeListing {
                volumes: Vec::new(),
                status: PoolStatus::Missing,
            });
        }
        match self.hypervisor.list_volumes(pool) {
            Ok(volumes) => Ok(VolumeListing {
                volumes,
                status: PoolStatus::Present,
            }),
            Err(VrcError::ToolMissing { tool }) => Err(VrcError::ToolMissing { tool }),
            Err(err) => Ok(VolumeListing {
                volumes: Vec::new(),
                status: PoolStatus::Unreadable {
                    details: err.to_string(),
                },
            }),
        }
    }

    /// Take the snapshot: domains first, so an unreachable daemon aborts before
    /// the pool is touched.
    pub fn collect(&self, pool: &str) -> Result<Inventory> {
        let domains = self.list_domains()?;
        let listing = self.list_volumes(pool)?;
        Ok(Inventory {
            endpoint: self.hypervisor.endpoint().to_string(),
            pool: pool.to_string(),
            pool_status: listing.status,
            domains,
            volumes: listing.volumes,
        })
    }
}
