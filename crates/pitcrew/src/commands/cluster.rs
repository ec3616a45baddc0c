//! Local TeamCity docker-compose cluster lifecycle and first-start bootstrap

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use pitcrew_core::settings::{env_or, require_env};
use pitcrew_core::{ApiClient, Auth, HttpError, PollOutcome, poll_until};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use super::error::CommandError;
use super::teamcity::DEFAULT_SERVER_URL;
use crate::compose::Compose;
use crate::util::browser;

const SERVER_SERVICE: &str = "server";
const AGENT_SERVICE: &str = "agent";

const SERVER_READY_TIMEOUT: Duration = Duration::from_secs(300);
const TOKEN_TIMEOUT: Duration = Duration::from_secs(120);
const AGENTS_TIMEOUT: Duration = Duration::from_secs(180);
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Local TeamCity docker-compose cluster lifecycle
#[derive(Args, Debug)]
pub struct ClusterArgs {
    #[command(subcommand)]
    command: ClusterCommands,
}

#[derive(Subcommand, Debug)]
enum ClusterCommands {
    /// Start the cluster and run first-start bootstrap
    Up(UpArgs),

    /// Stop the cluster
    Down(DownArgs),

    /// Open the server web UI in a browser
    Ui,

    /// Show compose and server state
    Status(StatusArgs),
}

/// Start the cluster
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Number of build agents to run
    #[arg(long, default_value_t = 1)]
    agents: u32,

    /// Compose file describing the cluster
    #[arg(long, default_value = "docker-compose.yml")]
    file: PathBuf,
}

/// Stop the cluster
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Also remove data volumes
    #[arg(long)]
    volumes: bool,

    /// Compose file describing the cluster
    #[arg(long, default_value = "docker-compose.yml")]
    file: PathBuf,
}

/// Show cluster status
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Compose file describing the cluster
    #[arg(long, default_value = "docker-compose.yml")]
    file: PathBuf,
}

/// Execute cluster command
pub fn execute(args: ClusterArgs) -> Result<()> {
    match args.command {
        ClusterCommands::Up(up_args) => execute_up(up_args),
        ClusterCommands::Down(down_args) => execute_down(down_args),
        ClusterCommands::Ui => execute_ui(),
        ClusterCommands::Status(status_args) => execute_status(status_args),
    }
}

fn execute_up(args: UpArgs) -> Result<()> {
    let url = env_or("TEAMCITY_URL", DEFAULT_SERVER_URL);
    // Resolve credentials before any container starts, so a missing variable
    // fails fast instead of after minutes of polling.
    let admin_user = require_env("TEAMCITY_USER")?;
    let admin_password = require_env("TEAMCITY_PASSWORD")?;

    let compose = Compose::new(args.file);
    println!("Starting TeamCity cluster with {} agent(s)...", args.agents);
    compose.up(AGENT_SERVICE, args.agents)?;

    let probe_client = ApiClient::new(&url, Auth::None)?;
    println!("Waiting for TeamCity server at {url}...");
    wait_for(SERVER_READY_TIMEOUT, "TeamCity server to answer HTTP", || {
        server_answers(&probe_client)
    })?;
    println!("Server is answering HTTP");

    println!("Looking for the super user token in server logs...");
    let mut token = None;
    wait_for(TOKEN_TIMEOUT, "super user token in server logs", || {
        let logs = compose.logs(SERVER_SERVICE)?;
        token = extract_super_user_token(&logs);
        Ok(token.is_some())
    })?;
    let token = token.context("server logs no longer contain the super user token")?;
    tracing::debug!("super user token found");

    ensure_admin_user(&url, &token, &admin_user, &admin_password)?;

    let admin = ApiClient::new(
        &url,
        Auth::Basic {
            user: admin_user,
            password: admin_password,
        },
    )?;

    println!("Waiting for {} authorized agent(s) to connect...", args.agents);
    let wanted = args.agents as usize;
    wait_for(AGENTS_TIMEOUT, "build agents to connect and authorize", || {
        // Agents register at their own pace; authorize whatever showed up
        // since the last pass before counting.
        authorize_pending_agents(&admin)?;
        Ok(connected_agent_count(&admin)? >= wanted)
    })?;

    println!("Cluster is ready: {url}");
    Ok(())
}

fn execute_down(args: DownArgs) -> Result<()> {
    let compose = Compose::new(args.file);
    compose.down(args.volumes)?;
    println!("Cluster stopped");
    Ok(())
}

fn execute_ui() -> Result<()> {
    let url = env_or("TEAMCITY_URL", DEFAULT_SERVER_URL);
    println!("Opening {url} in browser");
    browser::open_url(&url)
}

fn execute_status(args: StatusArgs) -> Result<()> {
    let url = env_or("TEAMCITY_URL", DEFAULT_SERVER_URL);
    let compose = Compose::new(args.file);
    let ps = compose.ps()?;

    let probe_client = ApiClient::new(&url, Auth::None)?;
    let reachable = matches!(server_answers(&probe_client), Ok(true));

    // Agent counts need credentials; skip them when the admin login is not
    // configured in the environment.
    let agents_connected = if reachable {
        super::teamcity::admin_client()
            .ok()
            .and_then(|admin| connected_agent_count(&admin).ok())
    } else {
        None
    };

    if args.json {
        let status = serde_json::json!({
            "url": url,
            "server_reachable": reachable,
            "agents_connected": agents_connected,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{ps}");
        println!();
        println!("Server:           {url}");
        println!("Server reachable: {}", if reachable { "yes" } else { "no" });
        if let Some(count) = agents_connected {
            println!("Agents connected: {count}");
        }
    }

    if !reachable {
        std::process::exit(1);
    }
    Ok(())
}

/// Run a poll loop and convert a timeout into a command error naming the
/// awaited condition.
fn wait_for<F>(timeout: Duration, condition: &str, probe: F) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    match poll_until(timeout, POLL_INTERVAL, probe)? {
        PollOutcome::Satisfied => Ok(()),
        PollOutcome::TimedOut => Err(CommandError::Timeout {
            seconds: timeout.as_secs(),
            condition: condition.to_string(),
        }
        .into()),
    }
}

/// Probe whether the server answers HTTP at all. Any status code counts:
/// a 503 maintenance page still proves the listener is up. Connection
/// errors mean "keep waiting".
fn server_answers(client: &ApiClient) -> Result<bool> {
    match client.probe("/app/rest/server") {
        Ok(_) => Ok(true),
        Err(HttpError::Transport { .. }) => Ok(false),
        Err(e) => Err(CommandError::Api(e).into()),
    }
}

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

/// Pull the most recent super user token out of the server log text. The
/// server prints a fresh token on every restart; only the last one works.
fn extract_super_user_token(logs: &str) -> Option<String> {
    let re = TOKEN_RE.get_or_init(|| {
        Regex::new(r"Super user authentication token: (\d+)").expect("static token pattern")
    });
    re.captures_iter(logs)
        .last()
        .map(|captures| captures[1].to_string())
}

/// Create the initial admin user through the super user REST login, unless
/// one already exists. The super user authenticates with an empty username
/// and the token as password, and only on `/httpAuth` paths.
fn ensure_admin_user(url: &str, token: &str, user: &str, password: &str) -> Result<()> {
    let super_user = ApiClient::new(
        url,
        Auth::Basic {
            user: String::new(),
            password: token.to_string(),
        },
    )?;

    match super_user.get_json::<serde_json::Value>(&format!(
        "/httpAuth/app/rest/users/username:{user}"
    )) {
        Ok(_) => {
            println!("Admin user '{user}' already exists");
            return Ok(());
        }
        Err(HttpError::Status { status, .. }) if status.as_u16() == 404 => {}
        Err(e) => return Err(CommandError::Api(e).into()),
    }

    let body = NewUser {
        username: user.to_string(),
        password: password.to_string(),
        roles: RoleAssignments {
            role: vec![RoleAssignment {
                role_id: "SYSTEM_ADMIN".to_string(),
                scope: "g".to_string(),
            }],
        },
    };
    let _: serde_json::Value = super_user.post_json("/httpAuth/app/rest/users", &body)?;
    println!("Created admin user '{user}'");
    Ok(())
}

/// Authorize every agent the server currently lists as unauthorized.
fn authorize_pending_agents(admin: &ApiClient) -> Result<()> {
    let listing: AgentListing =
        admin.get_json("/app/rest/agents?locator=authorized:false,defaultFilter:false")?;
    for agent in &listing.agents {
        admin.put_text(&format!("/app/rest/agents/id:{}/authorized", agent.id), "true")?;
        println!("Authorized agent '{}' (id {})", agent.name, agent.id);
    }
    Ok(())
}

/// Count agents that are both connected and authorized.
fn connected_agent_count(admin: &ApiClient) -> Result<usize> {
    let listing: AgentListing = admin
        .get_json("/app/rest/agents?locator=connected:true,authorized:true,defaultFilter:false")?;
    Ok(listing.count as usize)
}

/// Agent listing (from `GET /app/rest/agents`)
#[derive(Debug, Deserialize)]
struct AgentListing {
    count: u32,
    #[serde(rename = "agent", default)]
    agents: Vec<AgentRef>,
}

/// One entry in the agent listing
#[derive(Debug, Deserialize)]
struct AgentRef {
    id: u64,
    name: String,
}

/// Request body for `POST /app/rest/users`
#[derive(Debug, Serialize)]
struct NewUser {
    username: String,
    password: String,
    roles: RoleAssignments,
}

#[derive(Debug, Serialize)]
struct RoleAssignments {
    role: Vec<RoleAssignment>,
}

#[derive(Debug, Serialize)]
struct RoleAssignment {
    #[serde(rename = "roleId")]
    role_id: String,
    scope: String,
}
