//! TeamCity server operations

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use pitcrew_core::settings::{env_or, require_env};
use pitcrew_core::{ApiClient, Auth};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8111";

/// TeamCity server operations
#[derive(Args, Debug)]
pub struct TeamcityArgs {
    #[command(subcommand)]
    command: TeamcityCommands,
}

#[derive(Subcommand, Debug)]
enum TeamcityCommands {
    /// Export every VCS root configuration as JSON files
    ExportVcsRoots(ExportVcsRootsArgs),
}

/// Export VCS root configurations
#[derive(Args, Debug)]
pub struct ExportVcsRootsArgs {
    /// Directory to write one JSON file per VCS root into
    #[arg(long, default_value = "vcs-roots")]
    output: PathBuf,
}

/// Execute teamcity command
pub fn execute(args: TeamcityArgs) -> Result<()> {
    match args.command {
        TeamcityCommands::ExportVcsRoots(export_args) => execute_export_vcs_roots(export_args),
    }
}

/// Build a client for the configured TeamCity server using admin credentials.
pub fn admin_client() -> Result<ApiClient> {
    let url = env_or("TEAMCITY_URL", DEFAULT_SERVER_URL);
    let user = require_env("TEAMCITY_USER")?;
    let password = require_env("TEAMCITY_PASSWORD")?;
    Ok(ApiClient::new(&url, Auth::Basic { user, password })?)
}

fn execute_export_vcs_roots(args: ExportVcsRootsArgs) -> Result<()> {
    let client = admin_client()?;

    let listing: VcsRootListing = client.get_json("/app/rest/vcs-roots")?;
    tracing::debug!(count = listing.count, "fetched VCS root listing");

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create output directory {}", args.output.display()))?;

    for entry in &listing.vcs_roots {
        // Each listing entry is a stub; the href points at the full record.
        let detail: serde_json::Value = client.get_json(&entry.href)?;
        let path = export_path(&args.output, &entry.id);
        let pretty = serde_json::to_string_pretty(&detail)?;
        std::fs::write(&path, pretty + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("exported {} -> {}", entry.name, path.display());
    }

    println!(
        "{} VCS root(s) exported to {}",
        listing.vcs_roots.len(),
        args.output.display()
    );
    Ok(())
}

/// File path for one exported root. IDs come from TeamCity's external-ID
/// character set, but a path separator in one must not escape the directory.
fn export_path(output: &Path, id: &str) -> PathBuf {
    let safe: String = id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    output.join(format!("{safe}.json"))
}

/// VCS root listing (from `GET /app/rest/vcs-roots`)
#[derive(Debug, Deserialize)]
struct VcsRootListing {
    count: u32,
    #[serde(rename = "vcs-root", default)]
    vcs_roots: Vec<VcsRootEntry>,
}

/// One entry in the VCS root listing
#[derive(Debug, Deserialize)]
struct VcsRootEntry {
    id: String,
    name: String,
    href: String,
}
