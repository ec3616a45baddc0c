//! pitcrew - CI/CD operations chores from one CLI
//!
//! Automates the runbook tasks around BuildKite and TeamCity: rebuilding
//! cancelled pipeline builds, exporting VCS root configurations, and
//! bringing up a local TeamCity server/agent cluster with first-start
//! bootstrap.

use clap::Parser;

mod commands;
mod compose;
mod util;

use commands::Cli;

fn main() {
    pitcrew_core::logging::init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
