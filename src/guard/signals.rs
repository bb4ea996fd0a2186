//! Interrupt handling: SIGINT/SIGTERM/SIGHUP request a graceful stop.
//!
//! The first signal sets a flag that the executor checks between actions, so
//! the current virsh call finishes, the rest of the plan is skipped and the
//! run lock is released by normal unwinding. A second signal exits at once;
//! the kernel still drops the advisory lock with the process.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::flag;

use crate::core::errors::{Result, VrcError};

/// Exit status used when a second signal forces termination.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Shared shutdown-request flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register handlers for SIGINT, SIGTERM and SIGHUP.
    pub fn install(&self) -> Result<()> {
        for signal in [SIGINT, SIGTERM, SIGHUP] {
            // Order matters: the conditional shutdown only fires once the flag is already set.
            flag::register_conditional_shutdown(signal, FORCED_EXIT_CODE, Arc::clone(&self.requested))
                .and_then(|_| flag::register(signal, Arc::clone(&self.requested)))
                .map_err(|e| VrcError::Runtime {
                    details: format!("failed to install handler for signal {signal}: {e}"),
                })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}
