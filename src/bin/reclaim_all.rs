//! `reclaim-all`: destroy every domain and every non-protected volume.

use clap::Parser;
use virt_reclaim::cli_app::{ReclaimAllCli, run_all};

fn main() {
    let cli = ReclaimAllCli::parse();
    if let Err(e) = run_all(&cli) {
        std::process::exit(e.exit_code());
    }
}
