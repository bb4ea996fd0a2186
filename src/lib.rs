#![forbid(unsafe_code)]
//! virt_reclaim: reclaim libvirt domains and storage volumes left behind by
//! crashed or partial Vagrant lab teardowns.
//!
//! A run collects an inventory through a [`platform::pal::Hypervisor`],
//! selects targets with a [`reclaim::scope::ScopeRule`], builds an ordered
//! [`reclaim::plan::Plan`] and hands it to the [`reclaim::executor::Executor`].
//! Without `--force` nothing is mutated. Only one run may be active per host,
//! enforced by [`guard::lock::RunLock`].

pub mod core;
pub mod guard;
pub mod logger;
pub mod platform;
pub mod reclaim;
pub mod testing;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod cli_app;
