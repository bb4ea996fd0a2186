//! Platform abstraction: the control-plane trait and its `virsh` adapter.

pub mod pal;
pub mod virsh;
pub mod virsh_parse;
