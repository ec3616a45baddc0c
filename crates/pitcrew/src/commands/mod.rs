//! CLI command dispatch and execution

use anyhow::Result;
use clap::{Parser, Subcommand};

mod buildkite;
mod cluster;
pub(crate) mod error;
mod teamcity;

/// pitcrew - CI/CD operations chores from one CLI
#[derive(Parser, Debug)]
#[command(
    name = "pitcrew",
    version,
    about = "CI/CD operations chores: BuildKite rebuilds, TeamCity exports, cluster bootstrap",
    long_about = "Automates runbook tasks against the BuildKite and TeamCity REST APIs and a \
                  local docker-compose TeamCity cluster"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// BuildKite pipeline operations
    Buildkite(buildkite::BuildkiteArgs),

    /// TeamCity server operations
    Teamcity(teamcity::TeamcityArgs),

    /// Local TeamCity docker-compose cluster lifecycle
    Cluster(cluster::ClusterArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Buildkite(args) => buildkite::execute(args),
            Commands::Teamcity(args) => teamcity::execute(args),
            Commands::Cluster(args) => cluster::execute(args),
        }
    }
}
