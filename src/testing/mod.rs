//! In-memory [`Hypervisor`] used by unit, property and scenario tests.
//!
//! Mutations really change the fake's state, so a second run against the same
//! fake observes what the first run removed.

#![allow(missing_docs)]

use std::cell::RefCell;
use std::collections::HashSet;

use crate::core::errors::{Result, VrcError};
use crate::platform::pal::{Domain, DomainState, Hypervisor, Volume};

/// Call names that mutate state.
pub const MUTATING_CALLS: [&str; 3] = ["destroy", "undefine", "vol-delete"];

#[derive(Debug, Default)]
pub struct FakeHypervisor {
    domains: RefCell<Vec<Domain>>,
    volumes: RefCell<Vec<Volume>>,
    pools: HashSet<String>,
    unreadable_pools: HashSet<String>,
    failing: HashSet<(String, String)>,
    unreachable: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeHypervisor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_domain(self, name: &str, state: DomainState) -> Self {
        self.domains.borrow_mut().push(Domain::new(name, state));
        self
    }

    #[must_use]
    pub fn with_pool(mut self, pool: &str) -> Self {
        self.pools.insert(pool.to_string());
        self
    }

    #[must_use]
    pub fn with_volume(self, pool: &str, name: &str) -> Self {
        let this = self.with_pool(pool);
        this.volumes.borrow_mut().push(Volume::new(pool, name));
        this
    }

    #[must_use]
    pub fn with_unreadable_pool(mut self, pool: &str) -> Self {
        self.unreadable_pools.insert(pool.to_string());
        self
    }

    /// Make `op` (`destroy`, `undefine`, `vol-delete`) fail for `target`.
    #[must_use]
    pub fn failing(mut self, op: &str, target: &str) -> Self {
        self.failing.insert((op.to_string(), target.to_string()));
        self
    }

    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Every call made so far, as `"<op> <args>"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    #[must_use]
    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| {
                MUTATING_CALLS
                    .iter()
                    .any(|op| call.split_whitespace().next() == Some(*op))
            })
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn domains(&self) -> Vec<Domain> {
        self.domains.borrow().clone()
    }

    #[must_use]
    pub fn volumes(&self) -> Vec<Volume> {
        self.volumes.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn check_failure(&self, op: &'static str, target: &str) -> Result<()> {
        if self.failing.contains(&(op.to_string(), target.to_string())) {
            return Err(VrcError::ActionFailed {
                command: op,
                target: target.to_string(),
                details: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(VrcError::DaemonUnreachable {
                uri: self.endpoint().to_string(),
                details: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

impl Hypervisor for FakeHypervisor {
    fn endpoint(&self) -> &str {
        "fake:///"
    }

    fn list_domains(&self) -> Result<Vec<Domain>> {
        self.record("list_domains".to_string());
        self.check_reachable()?;
        Ok(self.domains())
    }

    fn pool_exists(&self, pool: &str) -> Result<bool> {
        self.record(format!("pool_exists {pool}"));
        self.check_reachable()?;
        Ok(self.pools.contains(pool))
    }

    fn list_volumes(&self, pool: &str) -> Result<Vec<Volume>> {
        self.record(format!("list_volumes {pool}"));
        self.check_reachable()?;
        if self.unreadable_pools.contains(pool) {
            return Err(VrcError::Runtime {
                details: format!("storage pool '{pool}' is not active"),
            });
        }
        Ok(self
            .volumes
            .borrow()
            .iter()
            .filter(|v| v.pool == pool)
            .cloned()
            .collect())
    }

    fn destroy_domain(&self, name: &str) -> Result<()> {
        self.record(format!("destroy {name}"));
        self.check_failure("destroy", name)?;
        let mut domains = self.domains.borrow_mut();
        match domains.iter_mut().find(|d| d.name == name) {
            Some(domain) if domain.state == DomainState::Running => {
                domain.state = DomainState::Stopped;
                Ok(())
            }
            _ => Err(VrcError::ActionFailed {
                command: "destroy",
                target: name.to_string(),
                details: "domain is not running".to_string(),
            }),
        }
    }

    fn undefine_domain(&self, name: &str) -> Result<()> {
        self.record(format!("undefine {name}"));
        self.check_failure("undefine", name)?;
        let mut domains = self.domains.borrow_mut();
        let before = domains.len();
        domains.retain(|d| d.name != name);
        if domains.len() == before {
            return Err(VrcError::ActionFailed {
                command: "undefine",
                target: name.to_string(),
                details: "domain not found".to_string(),
            });
        }
        Ok(())
    }

    fn delete_volume(&self, pool: &str, name: &str) -> Result<()> {
        self.record(format!("vol-delete {pool} {name}"));
        self.check_failure("vol-delete", name)?;
        let mut volumes = self.volumes.borrow_mut();
        let before = volumes.len();
        volumes.retain(|v| !(v.pool == pool && v.name == name));
        if volumes.len() == before {
            return Err(VrcError::ActionFailed {
                command: "vol-delete",
                target: name.to_string(),
                details: "volume not found".to_string(),
            });
        }
        Ok(())
    }
}
