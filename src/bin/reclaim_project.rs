//! `reclaim-project`: destroy the current project's domains and volumes.

use clap::Parser;
use virt_reclaim::cli_app::{ReclaimProjectCli, run_project};

fn main() {
    let cli = ReclaimProjectCli::parse();
    if let Err(e) = run_project(&cli) {
        std::process::exit(e.exit_code());
    }
}
