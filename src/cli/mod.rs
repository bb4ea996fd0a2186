//! CLI support: transcript reporter and the run session driven by `cli_app`.

pub mod reporter;
pub mod session;
