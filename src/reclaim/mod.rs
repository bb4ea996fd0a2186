//! Reclamation engine: inventory, scope, plan, execution.

pub mod executor;
pub mod inventory;
pub mod plan;
pub mod project;
pub mod scope;
