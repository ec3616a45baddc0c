//! BuildKite pipeline operations

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Args, Subcommand};
use pitcrew_core::settings::{env_or, require_env};
use pitcrew_core::{ApiClient, Auth};
use serde::Deserialize;

const DEFAULT_API_URL: &str = "https://api.buildkite.com";
const PAGE_SIZE: usize = 100;

/// BuildKite pipeline operations
#[derive(Args, Debug)]
pub struct BuildkiteArgs {
    #[command(subcommand)]
    command: BuildkiteCommands,
}

#[derive(Subcommand, Debug)]
enum BuildkiteCommands {
    /// Rebuild cancelled builds across the organization's pipelines
    RebuildCancelled(RebuildCancelledArgs),
}

/// Rebuild cancelled builds
#[derive(Args, Debug)]
pub struct RebuildCancelledArgs {
    /// Restrict to a single pipeline slug (default: every pipeline in the organization)
    #[arg(long)]
    pipeline: Option<String>,

    /// Only rebuild builds on this branch
    #[arg(long)]
    branch: Option<String>,

    /// Only rebuild builds created at or after this RFC 3339 timestamp
    #[arg(long)]
    since: Option<String>,

    /// Stop after rebuilding this many builds
    #[arg(long, default_value_t = 100)]
    limit: usize,

    /// List what would be rebuilt without triggering anything
    #[arg(long)]
    dry_run: bool,
}

/// Execute buildkite command
pub fn execute(args: BuildkiteArgs) -> Result<()> {
    match args.command {
        BuildkiteCommands::RebuildCancelled(rebuild_args) => {
            execute_rebuild_cancelled(rebuild_args)
        }
    }
}

fn execute_rebuild_cancelled(args: RebuildCancelledArgs) -> Result<()> {
    let org = require_env("BUILDKITE_ORGANIZATION")?;
    let token = require_env("BUILDKITE_API_TOKEN")?;
    let api_url = env_or("BUILDKITE_API_URL", DEFAULT_API_URL);

    let since = args
        .since
        .as_deref()
        .map(parse_since)
        .transpose()?;

    let client = ApiClient::new(&api_url, Auth::Bearer(token))?;

    let slugs = match &args.pipeline {
        Some(slug) => vec![slug.clone()],
        None => list_pipeline_slugs(&client, &org)?,
    };

    let mut rebuilt = 0usize;
    'pipelines: for slug in &slugs {
        let builds = cancelled_builds(&client, &org, slug, args.branch.as_deref())?;
        for build in builds {
            if rebuilt >= args.limit {
                println!("Reached limit of {} rebuilds, stopping", args.limit);
                break 'pipelines;
            }
            if let Some(cutoff) = since {
                if !created_at_or_after(&build, cutoff) {
                    continue;
                }
            }
            if args.dry_run {
                println!(
                    "would rebuild {slug}#{} ({}) {}",
                    build.number, build.branch, build.web_url
                );
            } else {
                let new_build: Build = client.put_empty(&format!(
                    "/v2/organizations/{org}/pipelines/{slug}/builds/{}/rebuild",
                    build.number
                ))?;
                tracing::debug!(pipeline = %slug, build = build.number, "rebuild triggered");
                println!(
                    "rebuilt {slug}#{} as #{} ({})",
                    build.number, new_build.number, build.branch
                );
            }
            rebuilt += 1;
        }
    }

    if args.dry_run {
        println!("{rebuilt} cancelled build(s) would be rebuilt");
    } else {
        println!("{rebuilt} cancelled build(s) rebuilt");
    }
    Ok(())
}

fn parse_since(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .context("--since must be an RFC 3339 timestamp like 2026-01-01T00:00:00Z")
}

/// List every pipeline slug in the organization, following pagination.
fn list_pipeline_slugs(client: &ApiClient, org: &str) -> Result<Vec<String>> {
    let mut slugs = Vec::new();
    let mut page = 1usize;
    loop {
        let pipelines: Vec<Pipeline> = client.get_json(&format!(
            "/v2/organizations/{org}/pipelines?page={page}&per_page={PAGE_SIZE}"
        ))?;
        let full_page = pipelines.len() == PAGE_SIZE;
        for pipeline in pipelines {
            tracing::debug!(pipeline = %pipeline.name, slug = %pipeline.slug, "found pipeline");
            slugs.push(pipeline.slug);
        }
        if !full_page {
            break;
        }
        page += 1;
    }
    Ok(slugs)
}

/// Fetch cancelled builds for one pipeline, following pagination.
fn cancelled_builds(
    client: &ApiClient,
    org: &str,
    slug: &str,
    branch: Option<&str>,
) -> Result<Vec<Build>> {
    let mut builds = Vec::new();
    let mut page = 1usize;
    loop {
        let mut path = format!(
            "/v2/organizations/{org}/pipelines/{slug}/builds?state=canceled&page={page}&per_page={PAGE_SIZE}"
        );
        if let Some(branch) = branch {
            path.push_str(&format!("&branch={}", encode_query_value(branch)));
        }
        let mut page_builds: Vec<Build> = client.get_json(&path)?;
        let full_page = page_builds.len() == PAGE_SIZE;
        // The state filter is in the query, but keep a guard against
        // partially cancelled matrix builds reported with other states.
        page_builds.retain(|b| b.state == "canceled");
        builds.extend(page_builds);
        if !full_page {
            break;
        }
        page += 1;
    }
    Ok(builds)
}

/// Encode a user-supplied value for a query string. Branch names can carry
/// `#`, `&`, or spaces, any of which would corrupt the request URL.
fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// True when the build carries a parsable `created_at` at or after `cutoff`.
/// Builds without a usable timestamp are excluded from `--since` runs.
fn created_at_or_after(build: &Build, cutoff: DateTime<FixedOffset>) -> bool {
    build
        .created_at
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .is_some_and(|created| created >= cutoff)
}

/// BuildKite pipeline JSON schema (from `GET /v2/organizations/{org}/pipelines`)
#[derive(Debug, Deserialize)]
struct Pipeline {
    slug: String,
    name: String,
}

/// BuildKite build JSON schema
#[derive(Debug, Deserialize)]
struct Build {
    number: u64,
    state: String,
    branch: String,
    web_url: String,
    created_at: Option<String>,
}
