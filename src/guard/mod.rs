//! Run guards: the single-instance lock and interrupt handling.

pub mod lock;
#[cfg(feature = "signals")]
pub mod signals;
